//! Schema registry
//!
//! Flattens the [`FieldDef`] tree into per-key slots, compiles every
//! expression once, and builds the schema-level dependency graph. The
//! registry is built during engine construction and immutable afterwards;
//! edges are per formula reference, independent of how many rows a
//! row-group holds at runtime.

use crate::error::{EngineError, EngineResult};
use ahash::AHashMap;
use formx_core::FieldDef;
use formx_formula::{compile, referenced_variables, DependencyGraph, Program};
use lazy_regex::regex_captures;

/// Compiled form of a field's expression
#[derive(Debug, Clone)]
pub(crate) enum CompiledField {
    /// General postfix program
    Expr(Program),
    /// `SUM(list.field)` aggregate over a row-group
    Sum { list: String, field: String },
}

/// Registration record for one flattened field
#[derive(Debug, Clone)]
pub(crate) struct FieldSlot {
    /// Key of the enclosing row-group, for fields living in row scope
    pub scope_parent: Option<String>,
    /// Compiled expression, when the field is derived and compiled cleanly
    pub program: Option<CompiledField>,
}

/// Flattened schema: field slots plus the dependency graph over their keys
pub(crate) struct SchemaRegistry {
    slots: AHashMap<String, FieldSlot>,
    /// Keys in schema order, for deterministic full recalculation
    order: Vec<String>,
    graph: DependencyGraph,
}

impl SchemaRegistry {
    /// Flatten and compile a schema
    pub fn build(fields: &[FieldDef]) -> EngineResult<Self> {
        let mut slots: AHashMap<String, FieldSlot> = AHashMap::new();
        let mut order = Vec::new();
        let mut graph = DependencyGraph::new();

        // Explicit worklist over (field, enclosing row-group key), pushed in
        // reverse so pop order matches schema order.
        let mut work: Vec<(&FieldDef, Option<String>)> =
            fields.iter().rev().map(|f| (f, None)).collect();

        while let Some((field, scope_parent)) = work.pop() {
            if slots.contains_key(field.key.as_str()) {
                return Err(EngineError::DuplicateKey(field.key.clone()));
            }
            graph.add_node(&field.key);

            let program = field
                .expression
                .as_deref()
                .and_then(|text| compile_field(&field.key, text, &mut graph));

            slots.insert(
                field.key.clone(),
                FieldSlot {
                    scope_parent: scope_parent.clone(),
                    program,
                },
            );
            order.push(field.key.clone());

            if let Some(group) = &field.row_group {
                for section in group.sections.iter().rev() {
                    for child in section.fields.iter().rev() {
                        work.push((child, Some(field.key.clone())));
                    }
                }
            }
        }

        Ok(SchemaRegistry {
            slots,
            order,
            graph,
        })
    }

    /// Slot for a flattened field key
    pub fn slot(&self, key: &str) -> Option<&FieldSlot> {
        self.slots.get(key)
    }

    /// Flattened fields with their slots, in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSlot)> {
        self.order
            .iter()
            .filter_map(|k| self.slots.get(k).map(|slot| (k.as_str(), slot)))
    }

    /// The dependency graph over field keys
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }
}

/// Compile one field's expression and register its dependency edges
///
/// A compile failure is contained: it is logged and the field carries no
/// program, so it behaves as a plain field.
fn compile_field(key: &str, text: &str, graph: &mut DependencyGraph) -> Option<CompiledField> {
    if let Some((list, field)) = sum_aggregate(text) {
        // Row edits retrigger via the row field; row add/remove via the list
        graph.add_dependency(&field, key);
        graph.add_dependency(&list, key);
        return Some(CompiledField::Sum { list, field });
    }

    match compile(text) {
        Ok(program) => {
            match referenced_variables(text) {
                Ok(names) => {
                    for name in names {
                        graph.add_dependency(&name, key);
                    }
                }
                Err(e) => {
                    log::warn!("field '{key}': cannot extract references from '{text}': {e}");
                }
            }
            Some(CompiledField::Expr(program))
        }
        Err(e) => {
            log::warn!("field '{key}': broken formula '{text}': {e}");
            None
        }
    }
}

/// Match an expression that is exactly `SUM(list.field)`
fn sum_aggregate(text: &str) -> Option<(String, String)> {
    let (_, list, field) = regex_captures!(
        r"^\s*SUM\s*\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)\s*$",
        text
    )?;
    Some((list.to_string(), field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_schema() -> Vec<FieldDef> {
        vec![
            FieldDef::new("tax_rate"),
            FieldDef::group(
                "items",
                [
                    FieldDef::new("price"),
                    FieldDef::new("qty"),
                    FieldDef::computed("amount", "price * qty"),
                ],
            ),
            FieldDef::computed("subtotal", "SUM(items.amount)"),
            FieldDef::computed("total", "subtotal * (1 + tax_rate)"),
        ]
    }

    #[test]
    fn test_flattens_row_group_fields() {
        let registry = SchemaRegistry::build(&invoice_schema()).unwrap();
        assert!(registry.slot("price").is_some());
        assert_eq!(
            registry.slot("amount").unwrap().scope_parent.as_deref(),
            Some("items")
        );
        assert_eq!(registry.slot("total").unwrap().scope_parent, None);
    }

    #[test]
    fn test_fields_in_schema_order() {
        let registry = SchemaRegistry::build(&invoice_schema()).unwrap();
        let keys: Vec<&str> = registry.fields().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            vec![
                "tax_rate", "items", "price", "qty", "amount", "subtotal", "total"
            ]
        );
    }

    #[test]
    fn test_registers_expression_edges() {
        let registry = SchemaRegistry::build(&invoice_schema()).unwrap();
        let deps: Vec<&str> = registry.graph().direct_dependents("price").collect();
        assert_eq!(deps, vec!["amount"]);
        let deps: Vec<&str> = registry.graph().direct_dependents("subtotal").collect();
        assert_eq!(deps, vec!["total"]);
    }

    #[test]
    fn test_sum_aggregate_edges() {
        let registry = SchemaRegistry::build(&invoice_schema()).unwrap();
        let deps: Vec<&str> = registry.graph().direct_dependents("amount").collect();
        assert_eq!(deps, vec!["subtotal"]);
        // Row add/remove retriggers through the list key itself
        let deps: Vec<&str> = registry.graph().direct_dependents("items").collect();
        assert_eq!(deps, vec!["subtotal"]);
    }

    #[test]
    fn test_sum_pattern() {
        assert_eq!(
            sum_aggregate("SUM(items.amount)"),
            Some(("items".to_string(), "amount".to_string()))
        );
        assert_eq!(
            sum_aggregate("  SUM( items . amount )  "),
            Some(("items".to_string(), "amount".to_string()))
        );
        // Anything more than the bare aggregate goes through the compiler
        assert_eq!(sum_aggregate("SUM(items.amount) * 2"), None);
        assert_eq!(sum_aggregate("SUM(amount)"), None);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let schema = vec![FieldDef::new("price"), FieldDef::new("price")];
        assert!(matches!(
            SchemaRegistry::build(&schema),
            Err(EngineError::DuplicateKey(k)) if k == "price"
        ));
    }

    #[test]
    fn test_duplicate_across_scopes_rejected() {
        let schema = vec![
            FieldDef::new("price"),
            FieldDef::group("items", [FieldDef::new("price")]),
        ];
        assert!(SchemaRegistry::build(&schema).is_err());
    }

    #[test]
    fn test_broken_formula_carries_no_program() {
        let schema = vec![FieldDef::computed("bad", "(a + b")];
        let registry = SchemaRegistry::build(&schema).unwrap();
        assert!(registry.slot("bad").unwrap().program.is_none());
    }
}
