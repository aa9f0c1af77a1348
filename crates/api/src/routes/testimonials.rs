//! Testimonials shown on the home page.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;

/// One client testimonial.
#[derive(Debug, Clone, Serialize)]
pub struct Testimonial {
    /// Client name.
    pub name: &'static str,
    /// Job title.
    pub role: &'static str,
    /// Employer.
    pub company: &'static str,
    /// Quote.
    pub content: &'static str,
    /// Stars out of five.
    pub rating: u8,
}

const TESTIMONIALS: [Testimonial; 3] = [
    Testimonial {
        name: "Sarah",
        role: "Software Engineer",
        company: "Amazon",
        content: "ApplyBoost helped me land my dream job in just 4 weeks. \
                  The personalized approach made all the difference.",
        rating: 5,
    },
    Testimonial {
        name: "Arvind Swamy",
        role: "Software Engineer III",
        company: "Walmart",
        content: "I was spending hours on applications with no results. \
                  ApplyBoost turned that around completely.",
        rating: 5,
    },
    Testimonial {
        name: "Mansi",
        role: "Product Manager",
        company: "Oracle",
        content: "The weekly updates and personalized applications helped me get \
                  multiple interviews. Highly recommended!",
        rating: 5,
    },
];

/// GET `/api/testimonials`
async fn list_testimonials() -> Json<&'static [Testimonial]> {
    Json(&TESTIMONIALS)
}

/// Creates testimonial routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/testimonials", get(list_testimonials))
}
