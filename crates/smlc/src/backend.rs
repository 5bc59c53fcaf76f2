//! Backend interface (C7)
//!
//! Receiving a successfully type-checked item is as far as this crate's
//! pipeline goes; what happens to it (interpretation, compilation) is
//! deliberately out of scope. [`Backend`] is the seam a real execution
//! engine would plug into.

use crate::ast::Item;
use crate::symtab::SymbolTable;
use crate::typechecker::CheckedItem;

/// Receives one type-checked top-level item at a time, in session order.
pub trait Backend {
    fn accept(&mut self, item: &Item, checked: &CheckedItem, symtab: &SymbolTable);
}

/// A backend that does nothing; the default for a session that only wants
/// type-checking diagnostics.
#[derive(Debug, Default)]
pub struct NullBackend;

impl Backend for NullBackend {
    fn accept(&mut self, _item: &Item, _checked: &CheckedItem, _symtab: &SymbolTable) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_backend_accepts_without_panicking() {
        let mut backend = NullBackend;
        let item = Item::Dec(crate::ast::Dec::Seq(Vec::new()));
        let checked = CheckedItem {
            ty: crate::types::Type::Unit,
            node_types: Default::default(),
            bindings: Default::default(),
        };
        let symtab = SymbolTable::new();
        backend.accept(&item, &checked, &symtab);
    }
}
