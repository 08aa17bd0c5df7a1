use axum::response::Html;
use dioxus::prelude::*;
use dioxus_core::NoOpMutations;

use crate::error::ApiError;

const FEATURES: [(&str, &str); 6] = [
    ("Smart Dashboard", "Income, expenses and balance at a glance with monthly trends."),
    ("Add Transaction", "Record income and expenses with categories, notes and location."),
    ("Calendar View", "Browse every day's spending on a calendar."),
    ("AI Finance Assistant", "Ask questions about your money in plain language."),
    ("Advanced Reports", "Daily, weekly and monthly reports with CSV export."),
    ("Secure Profile", "Token-protected account with hashed credentials."),
];

fn landing() -> Element {
    rsx! {
        head {
            meta { charset: "utf-8" }
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            title { "Finance Tracker" }
            script { src: "https://cdn.tailwindcss.com" }
        }
        body {
            class: "bg-gray-50 text-gray-900",
            section {
                class: "text-center py-20 bg-indigo-600 text-white",
                h1 { class: "text-5xl font-bold", "Master Your Financial Future" }
                p {
                    class: "mt-4 text-xl",
                    "Track spending, plan recurring payments and understand where your money goes."
                }
            }
            section {
                class: "grid grid-cols-1 md:grid-cols-3 gap-6 max-w-5xl mx-auto py-16 px-4",
                for (title, blurb) in FEATURES {
                    div {
                        key: "{title}",
                        class: "bg-white rounded-xl shadow p-6",
                        h3 { class: "text-lg font-semibold", "{title}" }
                        p { class: "mt-2 text-gray-600", "{blurb}" }
                    }
                }
            }
        }
    }
}

pub fn render_landing() -> Result<String, std::fmt::Error> {
    let mut renderer = dioxus_ssr::Renderer::new();
    let mut buffer = String::new();
    let mut vdom = VirtualDom::new(landing);
    vdom.rebuild(&mut NoOpMutations);
    renderer.render_to(&mut buffer, &vdom)?;
    Ok(format!("<!DOCTYPE html><html>{buffer}</html>"))
}

pub async fn home() -> Result<Html<String>, ApiError> {
    render_landing()
        .map(Html)
        .map_err(|e| ApiError::internal(format!("could not render landing page: {e}")))
}
