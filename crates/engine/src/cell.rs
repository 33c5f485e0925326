use std::cell::RefCell;

use crate::value::Value;

/// A single grid slot: the authoritative formula text plus a lazily filled
/// value cache.
///
/// The formula text is the source of truth; it is what gets persisted,
/// copied, and sorted on. The cached value is trustworthy only while the
/// dirty flag is clear. Reading the value fills the cache, so the cache
/// sits behind a `RefCell`; access is single-threaded by contract.
#[derive(Debug, Clone)]
pub struct Cell {
    formula: String,
    cache: RefCell<CachedValue>,
}

#[derive(Debug, Clone)]
struct CachedValue {
    value: Value,
    dirty: bool,
}

impl Cell {
    pub fn new(formula: &str) -> Self {
        Cell {
            formula: formula.to_string(),
            cache: RefCell::new(CachedValue {
                value: Value::Invalid,
                dirty: true,
            }),
        }
    }

    /// Replace the formula text. The text is stored verbatim; validation
    /// is deferred until the next value request.
    pub fn set_formula(&mut self, text: &str) {
        self.formula = text.to_string();
        self.mark_dirty();
    }

    /// The raw formula text, exactly as stored.
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Force recomputation on the next value request. Idempotent.
    pub fn mark_dirty(&self) {
        self.cache.borrow_mut().dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.borrow().dirty
    }

    /// Current value, recomputing through `eval` only when the cache is
    /// stale. Two consecutive reads without an intervening edit or dirty
    /// mark return the identical value.
    pub(crate) fn value_via(&self, eval: impl FnOnce(&str) -> Value) -> Value {
        {
            let cache = self.cache.borrow();
            if !cache.dirty {
                return cache.value.clone();
            }
        }

        // The borrow above must be dropped before evaluating: resolving a
        // reference chain may read other cells' caches through the same
        // mechanism.
        let value = eval(&self.formula);
        *self.cache.borrow_mut() = CachedValue {
            value: value.clone(),
            dirty: false,
        };
        value
    }
}
