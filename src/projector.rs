use crate::models::{CategoryFilter, SortConfig, Token};
use crate::registry::TokenRegistry;

/// Filters the registry down to `category` and orders the result per `sort`.
///
/// The sort is stable: equal keys, and every key when no field is selected, keep
/// the registry's relative order, so repeated projections never shuffle rows.
pub fn project(
    registry: &TokenRegistry,
    category: CategoryFilter,
    sort: &SortConfig,
) -> Vec<Token> {
    let mut projected: Vec<Token> = registry
        .iter()
        .filter(|token| category.matches(token))
        .cloned()
        .collect();
    sort_tokens(&mut projected, sort);
    projected
}

pub fn sort_tokens(tokens: &mut [Token], sort: &SortConfig) {
    let Some(field) = sort.field else {
        return;
    };
    // slice::sort_by is stable
    tokens.sort_by(|a, b| sort.direction.apply(field.value(a).compare(&field.value(b))));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortDirection, SortField, TokenCategory};
    use crate::tests::common::{create_test_token, ts};

    fn ids(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.id.as_str()).collect()
    }

    fn sorted(registry: &TokenRegistry, field: SortField, direction: SortDirection) -> Vec<Token> {
        project(registry, CategoryFilter::All, &SortConfig::new(field, direction))
    }

    fn mixed_registry() -> TokenRegistry {
        let mut a = create_test_token("a", TokenCategory::NewPairs, 5.0);
        a.volume_24h = 10.0;
        let mut b = create_test_token("b", TokenCategory::Migrated, 1.0);
        b.volume_24h = 30.0;
        let mut c = create_test_token("c", TokenCategory::NewPairs, 5.0);
        c.volume_24h = 20.0;
        let mut d = create_test_token("d", TokenCategory::NewPairs, 2.0);
        d.created_at = ts(50);
        d.last_updated = ts(50);
        let mut registry = TokenRegistry::new();
        registry.replace_all(vec![a, b, c, d]);
        registry
    }

    #[test]
    fn test_all_category_passes_everything_in_source_order() {
        let registry = mixed_registry();
        let view = project(&registry, CategoryFilter::All, &SortConfig::unsorted());
        assert_eq!(ids(&view), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_category_filter_keeps_relative_order() {
        let registry = mixed_registry();
        let view = project(&registry, TokenCategory::NewPairs.into(), &SortConfig::unsorted());
        assert_eq!(ids(&view), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_numeric_sort_directions() {
        let registry = mixed_registry();
        let asc = sorted(&registry, SortField::Volume24h, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["d", "a", "c", "b"]);
        let desc = sorted(&registry, SortField::Volume24h, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_ties_keep_source_order_in_both_directions() {
        let registry = mixed_registry();
        let desc = sorted(&registry, SortField::Price, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["a", "c", "d", "b"]);
        let asc = sorted(&registry, SortField::Price, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_created_at_sort() {
        let registry = mixed_registry();
        let view = sorted(&registry, SortField::CreatedAt, SortDirection::Desc);
        assert_eq!(view[0].id, "d");
    }

    #[test]
    fn test_text_sort_is_lexicographic() {
        let mut registry = TokenRegistry::new();
        let mut x = create_test_token("x", TokenCategory::NewPairs, 1.0);
        x.symbol = "YODA".to_string();
        let mut y = create_test_token("y", TokenCategory::NewPairs, 1.0);
        y.symbol = "MARU".to_string();
        let mut z = create_test_token("z", TokenCategory::NewPairs, 1.0);
        z.symbol = "SOL".to_string();
        registry.replace_all(vec![x, y, z]);

        let asc = sorted(&registry, SortField::Symbol, SortDirection::Asc);
        assert_eq!(ids(&asc), vec!["y", "z", "x"]);
        let desc = sorted(&registry, SortField::Symbol, SortDirection::Desc);
        assert_eq!(ids(&desc), vec!["x", "z", "y"]);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let registry = mixed_registry();
        let configs = [
            SortConfig::unsorted(),
            SortConfig::new(SortField::Price, SortDirection::Asc),
            SortConfig::new(SortField::Liquidity, SortDirection::Desc),
            SortConfig::new(SortField::Name, SortDirection::Asc),
        ];
        for config in configs {
            for filter in [
                CategoryFilter::All,
                TokenCategory::NewPairs.into(),
                TokenCategory::FinalStretch.into(),
            ] {
                assert_eq!(
                    project(&registry, filter, &config),
                    project(&registry, filter, &config)
                );
            }
        }
    }

    #[test]
    fn test_empty_category_projects_to_nothing() {
        let registry = mixed_registry();
        let view = project(&registry, TokenCategory::FinalStretch.into(), &SortConfig::unsorted());
        assert!(view.is_empty());
    }
}
