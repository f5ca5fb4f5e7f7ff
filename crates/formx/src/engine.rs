//! The runtime engine
//!
//! Owns the compiled schema and a handle to the host's store, and keeps
//! derived fields consistent with their inputs. Every external write enters
//! through [`Engine::set_value`]; the resulting cascade runs on an explicit
//! work stack inside a single store batch, so subscribers observe exactly
//! one notification per external call carrying every path it changed.
//!
//! Runtime faults never escape: broken formulas, unknown paths and
//! over-deep cascades are logged through the `log` facade and the affected
//! field keeps its prior value.

use crate::error::EngineResult;
use crate::registry::{CompiledField, SchemaRegistry};
use formx_core::{resolve, FieldDef, Path, Store, Value};
use formx_formula::{evaluate, Scope};
use std::cell::Cell;
use std::rc::Rc;

/// Ceiling on cascade depth, shared across re-entrant calls
///
/// A chain of recomputations longer than this (including `set_value` calls
/// re-entering from change subscribers) has its remaining branch dropped
/// with a warning instead of running away.
pub const CASCADE_DEPTH_LIMIT: u32 = 50;

/// What a pending cascade item writes when it is processed
enum Source {
    /// A value handed in from outside
    Literal(Value),
    /// A derived field, evaluated against fresh state at processing time
    Formula {
        key: String,
        row_base: Option<Path>,
    },
}

/// One pending write on the cascade work stack
struct Pending {
    target: Path,
    source: Source,
    depth: u32,
}

/// The reactive computation engine
pub struct Engine {
    registry: SchemaRegistry,
    store: Rc<dyn Store>,
    depth: Cell<u32>,
    cycle: Option<Vec<String>>,
}

impl Engine {
    /// Build an engine over a schema and a store
    ///
    /// Compiles every expression, wires the dependency graph, and runs an
    /// initial recalculation so derived fields are consistent with whatever
    /// state the store already holds. A dependency cycle is reported with a
    /// warning but does not fail construction; hosts that want to hard-fail
    /// can inspect [`Engine::cycle`].
    pub fn new(schema: &[FieldDef], store: Rc<dyn Store>) -> EngineResult<Engine> {
        let registry = SchemaRegistry::build(schema)?;

        let cycle = registry.graph().detect_cycle();
        if let Some(path) = &cycle {
            log::warn!("dependency cycle: {}", path.join(" -> "));
        }

        let engine = Engine {
            registry,
            store,
            depth: Cell::new(0),
            cycle,
        };
        engine.recalculate();
        Ok(engine)
    }

    /// The store this engine writes through
    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    /// The dependency cycle found at construction, if any
    pub fn cycle(&self) -> Option<&[String]> {
        self.cycle.as_deref()
    }

    /// Write one value and cascade through everything derived from it
    ///
    /// The write and its entire cascade land in one store batch, so
    /// subscribers see a single notification. Unchanged values (within
    /// float tolerance) are a no-op. Faults are contained and logged.
    pub fn set_value(&self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        let entry = self.depth.get();
        if entry >= CASCADE_DEPTH_LIMIT {
            log::warn!("cascade ceiling ({CASCADE_DEPTH_LIMIT}) reached, dropping write to '{path}'");
            return;
        }

        let target = match Path::parse(path) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("dropping write to unparseable path: {e}");
                return;
            }
        };

        if let Some(current) = resolve(&self.store.state(), &target) {
            if current.approx_eq(&value) {
                return;
            }
        }

        self.run(vec![Pending {
            target,
            source: Source::Literal(value),
            depth: entry,
        }]);
    }

    /// Recompute every derived field against current state
    ///
    /// Row-scope formulas run once per existing row. Runs automatically at
    /// construction; hosts may call it again after replacing state
    /// wholesale.
    pub fn recalculate(&self) {
        if self.depth.get() >= CASCADE_DEPTH_LIMIT {
            log::warn!("cascade ceiling ({CASCADE_DEPTH_LIMIT}) reached, skipping recalculation");
            return;
        }

        let state = self.store.state();
        let mut seed = Vec::new();
        for (key, slot) in self.registry.fields() {
            if slot.program.is_none() {
                continue;
            }
            for base in self.row_bases(&state, slot.scope_parent.as_deref()) {
                let (target, row_base) = match base {
                    Some(base) => (base.child(key), Some(base)),
                    None => match Path::parse(key) {
                        Ok(p) => (p, None),
                        Err(_) => continue,
                    },
                };
                seed.push(Pending {
                    target,
                    source: Source::Formula {
                        key: key.to_string(),
                        row_base,
                    },
                    depth: self.depth.get(),
                });
            }
        }
        // The work stack pops LIFO; reverse so fields run in schema order
        seed.reverse();
        self.run(seed);
    }

    /// Run a cascade from seed writes, inside one batch
    ///
    /// The depth counter stays raised through the store's close-of-batch
    /// notification, so `set_value` calls re-entering from subscribers
    /// share the same budget.
    fn run(&self, seed: Vec<Pending>) {
        let entry = self.depth.get();
        self.depth.set(entry + 1);
        let mut seed = Some(seed);
        self.store.batch(&mut || {
            if let Some(work) = seed.take() {
                self.drain(work);
            }
        });
        self.depth.set(entry);
    }

    /// Process pending writes until the work stack empties
    ///
    /// Dependents are pushed in reverse so processing order matches a
    /// depth-first walk of the dependency graph. Each item is evaluated at
    /// pop time, against the state all earlier writes produced.
    fn drain(&self, mut work: Vec<Pending>) {
        while let Some(item) = work.pop() {
            if item.depth >= CASCADE_DEPTH_LIMIT {
                log::warn!(
                    "cascade ceiling ({CASCADE_DEPTH_LIMIT}) reached at '{}', branch dropped",
                    item.target
                );
                continue;
            }

            let value = match &item.source {
                Source::Literal(value) => value.clone(),
                Source::Formula { key, row_base } => {
                    match self.evaluate_field(key, row_base.as_ref()) {
                        Some(value) => value,
                        // Fault already logged; the field keeps its value
                        None => continue,
                    }
                }
            };

            let state = self.store.state();
            if let Some(current) = resolve(&state, &item.target) {
                if current.approx_eq(&value) {
                    continue;
                }
            }
            self.store.set_value(&item.target.to_string(), value);

            let Some(key) = item.target.last_key() else {
                continue;
            };
            let row_ctx = item.target.row_context();

            let mut next = Vec::new();
            for dep in self.registry.graph().direct_dependents(key) {
                let Some(slot) = self.registry.slot(dep) else {
                    continue;
                };
                if slot.program.is_none() {
                    continue;
                }
                match (&row_ctx, slot.scope_parent.as_deref()) {
                    // Row write feeding a formula in the same row-group:
                    // recompute at the same row
                    (Some((list, _, row_base)), Some(parent)) if parent == *list => {
                        next.push(Pending {
                            target: row_base.child(dep),
                            source: Source::Formula {
                                key: dep.to_string(),
                                row_base: Some(row_base.clone()),
                            },
                            depth: item.depth + 1,
                        });
                    }
                    // Top-level formulas and SUM aggregates
                    (_, None) => {
                        let Ok(target) = Path::parse(dep) else {
                            continue;
                        };
                        next.push(Pending {
                            target,
                            source: Source::Formula {
                                key: dep.to_string(),
                                row_base: None,
                            },
                            depth: item.depth + 1,
                        });
                    }
                    // Formula belongs to an unrelated row-group: out of scope
                    _ => {}
                }
            }
            work.extend(next.into_iter().rev());
        }
    }

    /// Evaluate one derived field against current state
    ///
    /// Returns `None` on a contained fault (no program, missing row,
    /// evaluation error), after logging it.
    fn evaluate_field(&self, key: &str, row_base: Option<&Path>) -> Option<Value> {
        let slot = self.registry.slot(key)?;
        let state = self.store.state();

        match slot.program.as_ref()? {
            CompiledField::Expr(program) => {
                let row = match row_base {
                    Some(base) => match resolve(&state, base) {
                        Some(row) => Some(row.clone()),
                        None => {
                            log::warn!("field '{key}': row '{base}' no longer exists");
                            return None;
                        }
                    },
                    None => None,
                };
                let scope = EvalScope {
                    row: row.as_ref(),
                    global: &state,
                };
                match evaluate(program, &scope) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("field '{key}': evaluation failed: {e}");
                        None
                    }
                }
            }
            CompiledField::Sum { list, field } => Some(Value::Number(sum_rows(&state, list, field))),
        }
    }

    /// Paths of every existing row a scoped formula must run in
    ///
    /// `None` in the result stands for global scope. Nested row-groups
    /// multiply out: the scope chain is resolved from the outermost group
    /// inwards against current state.
    fn row_bases(&self, state: &Value, scope: Option<&str>) -> Vec<Option<Path>> {
        let mut chain = Vec::new();
        let mut cursor = scope;
        while let Some(key) = cursor {
            chain.push(key);
            cursor = self
                .registry
                .slot(key)
                .and_then(|slot| slot.scope_parent.as_deref());
        }
        chain.reverse();

        let mut bases: Vec<Option<Path>> = vec![None];
        for list_key in chain {
            let mut expanded = Vec::new();
            for outer in &bases {
                let list_path = match outer {
                    Some(base) => base.child(list_key),
                    None => match Path::parse(list_key) {
                        Ok(p) => p,
                        Err(_) => continue,
                    },
                };
                if let Some(Value::List(rows)) = resolve(state, &list_path) {
                    for index in 0..rows.len() {
                        expanded.push(Some(list_path.child_index(index)));
                    }
                }
            }
            bases = expanded;
        }
        bases
    }
}

/// Row record overlaid on global state: row fields shadow globals
struct EvalScope<'a> {
    row: Option<&'a Value>,
    global: &'a Value,
}

impl Scope for EvalScope<'_> {
    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(row) = self.row {
            if let Some(value) = row.field(key) {
                return Some(value.clone());
            }
        }
        self.global.field(key).cloned()
    }
}

/// Reduce a row-group column to its sum, non-numeric entries as 0
fn sum_rows(state: &Value, list: &str, field: &str) -> f64 {
    let rows = match state.field(list) {
        Some(Value::List(rows)) => rows,
        _ => return 0.0,
    };
    let total: f64 = rows
        .iter()
        .map(|row| row.field(field).map_or(0.0, Value::coerce_number))
        .sum();
    if total.is_finite() {
        total
    } else {
        0.0
    }
}
