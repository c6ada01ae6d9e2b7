use pharmabill_core::{LineItem, SupplyType};

use crate::totals::{DocumentCharges, DocumentTotals, compute_document_totals};

/// A sale being keyed in. Holds only the inputs; totals are derived from the
/// current lines on every call.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    supply: SupplyType,
    lines: Vec<LineItem>,
    charges: DocumentCharges,
}

impl SaleDraft {
    /// `supply` is decided once, when the document is opened for a customer.
    pub fn new(supply: SupplyType) -> Self {
        Self {
            supply,
            lines: Vec::new(),
            charges: DocumentCharges::default(),
        }
    }

    pub fn supply(&self) -> SupplyType {
        self.supply
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add_line(&mut self, item: LineItem) -> usize {
        self.lines.push(item);
        self.lines.len() - 1
    }

    /// Returns the replaced line, or `None` when `index` is out of range.
    pub fn update_line(&mut self, index: usize, item: LineItem) -> Option<LineItem> {
        self.lines
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, item))
    }

    pub fn remove_line(&mut self, index: usize) -> Option<LineItem> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn set_charges(&mut self, charges: DocumentCharges) {
        self.charges = charges;
    }

    pub fn totals(&self) -> DocumentTotals {
        compute_document_totals(&self.lines, self.supply, self.charges)
    }
}
