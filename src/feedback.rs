//! Maps an aggregate value and a statistic category to personalised
//! display text via the curated template table.

use thiserror::Error;

use crate::models::FeedbackTemplate;

pub const TIME_VIDEO: &str = "timeVideo";
pub const TIME_NON_VIDEO: &str = "timeNonVideo";
pub const SCROLL_VIDEO: &str = "scrollVideo";
pub const SCROLL_NON_VIDEO: &str = "scrollNonVideo";

pub const FALLBACK_MESSAGE: &str = "No personalised feedback available yet.";

/// Resolves an average to display text: first template in collection order
/// whose category matches and whose inclusive [min, max] range contains the
/// value. Templates with a malformed range (wrong arity) are skipped. A
/// miss is a normal outcome and yields the fixed fallback string.
pub fn resolve(templates: &[FeedbackTemplate], category: &str, average: f64) -> String {
    for template in templates.iter().filter(|t| t.category == category) {
        let [min, max] = match template.average[..] {
            [min, max] => [min, max],
            _ => {
                tracing::warn!(
                    template = template.id,
                    arity = template.average.len(),
                    "skipping feedback template with malformed range"
                );
                continue;
            }
        };
        if average >= min && average <= max {
            return format!("{} {} {}", template.first_part, average.round() as i64, template.second_part);
        }
    }
    tracing::debug!(category, average, "no feedback template matched");
    FALLBACK_MESSAGE.to_string()
}

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("category {category}: ranges [{first_min}, {first_max}] and [{second_min}, {second_max}] overlap")]
    Overlap {
        category: String,
        first_min: f64,
        first_max: f64,
        second_min: f64,
        second_max: f64,
    },
}

/// Checks the reference data once at load time. Within a category, ranges
/// sorted by their lower bound must not overlap on an interval of nonzero
/// width. Adjacent ranges may share a single endpoint (inclusive float
/// ranges cannot tile the axis otherwise); the resolver's collection order
/// decides the boundary value. Gaps are legal: a miss falls back.
pub fn validate_templates(templates: &[FeedbackTemplate]) -> Result<(), TemplateError> {
    let mut categories: Vec<&str> = templates.iter().map(|t| t.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();

    for category in categories {
        let mut ranges: Vec<(f64, f64)> = templates
            .iter()
            .filter(|t| t.category == category)
            .filter_map(|t| match t.average[..] {
                [min, max] => Some((min, max)),
                _ => None,
            })
            .collect();
        ranges.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut prev: Option<(f64, f64)> = None;
        for (min, max) in ranges {
            if let Some((prev_min, prev_max)) = prev {
                if min < prev_max {
                    return Err(TemplateError::Overlap {
                        category: category.to_string(),
                        first_min: prev_min,
                        first_max: prev_max,
                        second_min: min,
                        second_max: max,
                    });
                }
                // keep the widest reach seen so far
                if max < prev_max {
                    prev = Some((prev_min, prev_max));
                    continue;
                }
            }
            prev = Some((min, max));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: i64, category: &str, average: Vec<f64>, first: &str, second: &str) -> FeedbackTemplate {
        FeedbackTemplate {
            id,
            category: category.to_string(),
            average,
            first_part: first.to_string(),
            second_part: second.to_string(),
        }
    }

    #[test]
    fn resolves_the_matching_range() {
        let templates = [template(
            1,
            SCROLL_VIDEO,
            vec![50.0, 100.0],
            "You scrolled",
            "of video units",
        )];
        assert_eq!(
            resolve(&templates, SCROLL_VIDEO, 75.0),
            "You scrolled 75 of video units"
        );
    }

    #[test]
    fn miss_returns_the_fixed_fallback() {
        let templates = [template(1, SCROLL_VIDEO, vec![50.0, 100.0], "a", "b")];
        assert_eq!(resolve(&templates, SCROLL_VIDEO, 20.0), FALLBACK_MESSAGE);
        assert_eq!(resolve(&templates, TIME_VIDEO, 75.0), FALLBACK_MESSAGE);
        assert_eq!(resolve(&[], SCROLL_VIDEO, 75.0), FALLBACK_MESSAGE);
    }

    #[test]
    fn overlapping_templates_resolve_to_the_first_in_order() {
        let templates = [
            template(1, TIME_VIDEO, vec![0.0, 100.0], "first", "wins"),
            template(2, TIME_VIDEO, vec![0.0, 100.0], "second", "loses"),
        ];
        assert_eq!(resolve(&templates, TIME_VIDEO, 30.0), "first 30 wins");
    }

    #[test]
    fn malformed_arity_is_skipped_not_fatal() {
        let templates = [
            template(1, TIME_VIDEO, vec![0.0], "broken", "range"),
            template(2, TIME_VIDEO, vec![0.0, 10.0, 100.0], "also", "broken"),
        ];
        assert_eq!(resolve(&templates, TIME_VIDEO, 5.0), FALLBACK_MESSAGE);
    }

    #[test]
    fn display_value_is_rounded_to_the_nearest_integer() {
        let templates = [template(1, SCROLL_NON_VIDEO, vec![0.0, 100.0], "about", "percent")];
        assert_eq!(resolve(&templates, SCROLL_NON_VIDEO, 74.6), "about 75 percent");
        assert_eq!(resolve(&templates, SCROLL_NON_VIDEO, 74.4), "about 74 percent");
    }

    #[test]
    fn zero_average_matches_a_range_starting_at_zero() {
        let templates = [template(1, TIME_NON_VIDEO, vec![0.0, 60.0], "only", "seconds")];
        assert_eq!(resolve(&templates, TIME_NON_VIDEO, 0.0), "only 0 seconds");
    }

    #[test]
    fn validation_rejects_interior_overlap() {
        let templates = [
            template(1, SCROLL_VIDEO, vec![0.0, 60.0], "a", "b"),
            template(2, SCROLL_VIDEO, vec![40.0, 100.0], "c", "d"),
        ];
        assert!(validate_templates(&templates).is_err());
    }

    #[test]
    fn validation_rejects_a_contained_range() {
        let templates = [
            template(1, SCROLL_VIDEO, vec![0.0, 100.0], "a", "b"),
            template(2, SCROLL_VIDEO, vec![10.0, 20.0], "c", "d"),
            template(3, SCROLL_VIDEO, vec![30.0, 40.0], "e", "f"),
        ];
        assert!(validate_templates(&templates).is_err());
    }

    #[test]
    fn validation_accepts_shared_endpoints_and_gaps() {
        let templates = [
            template(1, SCROLL_VIDEO, vec![0.0, 50.0], "a", "b"),
            template(2, SCROLL_VIDEO, vec![50.0, 80.0], "c", "d"),
            template(3, SCROLL_VIDEO, vec![90.0, 100.0], "e", "f"),
        ];
        assert_eq!(validate_templates(&templates), Ok(()));
    }

    #[test]
    fn validation_treats_categories_independently() {
        let templates = [
            template(1, SCROLL_VIDEO, vec![0.0, 100.0], "a", "b"),
            template(2, TIME_VIDEO, vec![0.0, 100.0], "c", "d"),
        ];
        assert_eq!(validate_templates(&templates), Ok(()));
    }
}
