//! Variant selection: a tool with alternate implementations (e.g. a
//! Rust-accelerated entry point alongside a pure-Python one) picks the
//! best one available before invocation.

use skill_types::{ToolVariant, VariantStatus};

fn status_order(status: VariantStatus) -> u8 {
    match status {
        VariantStatus::Available => 0,
        VariantStatus::Degraded => 1,
        VariantStatus::Unavailable => 2,
    }
}

/// Picks the best variant: `Unavailable` variants are never selected;
/// among the rest, `Available` beats `Degraded`, ties broken by lowest
/// `priority`. Returns `None` if `variants` is empty or every entry is
/// `Unavailable`.
pub fn select_variant(variants: &[ToolVariant]) -> Option<&ToolVariant> {
    variants
        .iter()
        .filter(|v| v.status != VariantStatus::Unavailable)
        .min_by_key(|v| (status_order(v.status), v.priority))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn variant(name: &str, status: VariantStatus, priority: i32) -> ToolVariant {
        ToolVariant {
            variant_name: name.to_string(),
            status,
            priority,
            entry_point: PathBuf::from(format!("{name}.py")),
            content_hash: "deadbeef".to_string(),
        }
    }

    #[test]
    fn empty_variants_selects_nothing() {
        assert!(select_variant(&[]).is_none());
    }

    #[test]
    fn unavailable_variants_are_never_selected() {
        let variants = vec![variant("rust", VariantStatus::Unavailable, 0)];
        assert!(select_variant(&variants).is_none());
    }

    #[test]
    fn available_beats_degraded_regardless_of_priority() {
        let variants = vec![
            variant("local", VariantStatus::Degraded, 0),
            variant("rust", VariantStatus::Available, 100),
        ];
        assert_eq!(select_variant(&variants).unwrap().variant_name, "rust");
    }

    #[test]
    fn lower_priority_wins_among_equal_status() {
        let variants = vec![
            variant("remote", VariantStatus::Available, 50),
            variant("local", VariantStatus::Available, 10),
        ];
        assert_eq!(select_variant(&variants).unwrap().variant_name, "local");
    }

    #[test]
    fn excludes_unavailable_then_falls_back_to_degraded() {
        let variants = vec![
            variant("rust", VariantStatus::Unavailable, 0),
            variant("local", VariantStatus::Degraded, 5),
        ];
        assert_eq!(select_variant(&variants).unwrap().variant_name, "local");
    }
}
