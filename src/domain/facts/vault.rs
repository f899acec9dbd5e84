//! Static enrichment tables.

use std::collections::BTreeMap;

use crate::domain::foundation::Facts;

/// Read-only lookup from known fact values to richer associated facts,
/// e.g. a product code to its price and description.
#[derive(Debug, Clone, Default)]
pub struct Vault {
    tables: BTreeMap<String, BTreeMap<String, Facts>>,
}

impl Vault {
    pub fn new(tables: BTreeMap<String, BTreeMap<String, Facts>>) -> Self {
        Self { tables }
    }

    pub fn lookup(&self, fact_key: &str, value: &str) -> Option<&Facts> {
        self.tables.get(fact_key)?.get(value)
    }

    /// Returns a copy of `facts` augmented with every matching vault entry.
    ///
    /// Entries never replace facts that are already present, and the input
    /// is left untouched.
    pub fn enrich(&self, facts: &Facts) -> Facts {
        let mut out = facts.clone();
        for (fact_key, table) in &self.tables {
            let Some(value) = facts.get(fact_key) else {
                continue;
            };
            for item in value.items() {
                if let Some(entry) = table.get(&item.as_key()) {
                    for (key, associated) in entry.iter() {
                        if !out.contains(key) {
                            out.insert(key.clone(), associated.clone());
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::FactValue;
    use crate::facts;

    fn vault() -> Vault {
        let mut products = BTreeMap::new();
        products.insert("A1".to_string(), facts!("price" => 199.0, "desc" => "基础套餐"));
        products.insert("12".to_string(), facts!("price" => 12.0));
        let mut tables = BTreeMap::new();
        tables.insert("product".to_string(), products);
        Vault::new(tables)
    }

    #[test]
    fn enrich_adds_associated_facts() {
        let base = facts!("product" => "A1");
        let enriched = vault().enrich(&base);
        assert_eq!(enriched.get("price"), Some(&FactValue::Number(199.0)));
        assert_eq!(enriched.get("desc"), Some(&FactValue::from("基础套餐")));
    }

    #[test]
    fn enrich_leaves_input_untouched() {
        let base = facts!("product" => "A1");
        let _ = vault().enrich(&base);
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn enrich_never_overrides_existing_fact() {
        let base = facts!("product" => "A1", "price" => 99.0);
        let enriched = vault().enrich(&base);
        assert_eq!(enriched.get("price"), Some(&FactValue::Number(99.0)));
    }

    #[test]
    fn numeric_values_match_by_key_form() {
        let base = facts!("product" => 12.0);
        assert!(vault().enrich(&base).contains("price"));
    }

    #[test]
    fn unknown_value_adds_nothing() {
        let base = facts!("product" => "Z9");
        assert_eq!(vault().enrich(&base), base);
    }
}
