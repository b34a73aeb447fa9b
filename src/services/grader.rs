// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Synthetic pricing-page grading.
//!
//! No page is fetched. Results are drawn at random within fixed bounds so
//! the rest of the product can be exercised end to end.

use crate::models::{Grade, ScanMetrics, ScanUpdate};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;

const SCORE_RANGE: RangeInclusive<u8> = 60..=100;
const RECOMMENDATION_COUNT: RangeInclusive<usize> = 2..=4;
const FINDING_COUNT: RangeInclusive<usize> = 2..=3;

const RECOMMENDATIONS: &[&str] = &[
    "Add social proof testimonials",
    "Highlight most popular plan",
    "Include annual discount pricing",
    "Clarify feature differences",
    "Add FAQ section",
    "Improve CTA visibility",
    "Add urgency indicators",
    "Improve pricing table layout",
    "Include enterprise contact option",
];

const STRENGTHS: &[&str] = &[
    "Clear pricing tiers",
    "Strong CTAs",
    "Good mobile design",
    "Social proof",
    "Feature comparison",
    "FAQ section",
];

const WEAKNESSES: &[&str] = &[
    "Missing testimonials",
    "No annual discount shown",
    "Cluttered design",
    "Weak CTAs",
    "Poor mobile experience",
    "No FAQ section",
];

/// Outcome of grading one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub grade: Grade,
    pub score: u8,
    pub recommendations: Vec<String>,
    pub metrics: ScanMetrics,
}

impl Analysis {
    pub fn into_update(self) -> ScanUpdate {
        ScanUpdate::completed(self.grade, self.score, self.recommendations, self.metrics)
    }
}

/// One side of a competitor comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PageAssessment {
    pub url: String,
    pub grade: Grade,
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Comparison {
    pub primary: PageAssessment,
    pub competitor: PageAssessment,
    pub insights: Vec<String>,
}

/// Grade band for a synthetic score. Only A to C are produced.
pub fn grade_for_score(score: u8) -> Grade {
    if score >= 87 {
        Grade::A
    } else if score >= 74 {
        Grade::B
    } else {
        Grade::C
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Grader;

impl Grader {
    pub fn analyze(&self) -> Analysis {
        self.analyze_with(&mut rand::rng())
    }

    pub fn analyze_with<R: Rng>(&self, rng: &mut R) -> Analysis {
        let score = rng.random_range(SCORE_RANGE);
        let count = rng.random_range(RECOMMENDATION_COUNT);

        Analysis {
            grade: grade_for_score(score),
            score,
            recommendations: pick(RECOMMENDATIONS, count, rng),
            metrics: ScanMetrics {
                clarity: rng.random_range(SCORE_RANGE),
                trust: rng.random_range(SCORE_RANGE),
                cta: rng.random_range(SCORE_RANGE),
                mobile: rng.random_range(SCORE_RANGE),
            },
        }
    }

    pub fn compare(&self, primary_url: &str, competitor_url: &str) -> Comparison {
        self.compare_with(primary_url, competitor_url, &mut rand::rng())
    }

    pub fn compare_with<R: Rng>(
        &self,
        primary_url: &str,
        competitor_url: &str,
        rng: &mut R,
    ) -> Comparison {
        let primary = assess(primary_url, rng);
        let competitor = assess(competitor_url, rng);
        let insights = insights(&primary, &competitor);

        Comparison {
            primary,
            competitor,
            insights,
        }
    }
}

fn assess<R: Rng>(url: &str, rng: &mut R) -> PageAssessment {
    let score = rng.random_range(SCORE_RANGE);
    let strengths = rng.random_range(FINDING_COUNT);
    let weaknesses = rng.random_range(FINDING_COUNT);

    PageAssessment {
        url: url.to_string(),
        grade: grade_for_score(score),
        score,
        strengths: pick(STRENGTHS, strengths, rng),
        weaknesses: pick(WEAKNESSES, weaknesses, rng),
    }
}

fn pick<R: Rng>(pool: &[&str], count: usize, rng: &mut R) -> Vec<String> {
    pool.choose_multiple(rng, count)
        .map(|s| s.to_string())
        .collect()
}

fn insights(primary: &PageAssessment, competitor: &PageAssessment) -> Vec<String> {
    let mut insights = Vec::new();

    let headline = match primary.score.cmp(&competitor.score) {
        std::cmp::Ordering::Greater => format!(
            "Your page scores higher overall ({} vs {})",
            primary.score, competitor.score
        ),
        std::cmp::Ordering::Less => format!(
            "Competitor scores higher overall ({} vs {})",
            competitor.score, primary.score
        ),
        std::cmp::Ordering::Equal => format!("Both pages score {} overall", primary.score),
    };
    insights.push(headline);

    for strength in &competitor.strengths {
        if !primary.strengths.contains(strength) {
            insights.push(format!("Consider adding {} like your competitor", strength.to_lowercase()));
        }
    }

    for strength in &primary.strengths {
        if competitor
            .weaknesses
            .iter()
            .any(|w| shares_topic(strength, w))
        {
            insights.push(format!("{strength} is an advantage over the competitor"));
        }
    }

    insights
}

/// Rough topic match between a strength and a weakness ("Strong CTAs" / "Weak CTAs").
fn shares_topic(strength: &str, weakness: &str) -> bool {
    const TOPICS: &[&str] = &["cta", "mobile", "faq", "testimonial", "design"];
    let (s, w) = (strength.to_lowercase(), weakness.to_lowercase());
    TOPICS.iter().any(|t| s.contains(t) && w.contains(t))
        || (s.contains("social proof") && w.contains("testimonial"))
}
