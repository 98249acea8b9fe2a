use std::collections::HashSet;

use tracing::{debug, warn};

use super::domain::{ProductDetails, ProductId, ProductLine};
use super::error::ExamError;

/// Ordered line items of the exam in progress. Ids are unique within the
/// sequence and stay stable across edits.
#[derive(Debug, Default, Clone)]
pub struct ProductRegistry {
    lines: Vec<ProductLine>,
    next_sequence: u64,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[ProductLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, id: &ProductId) -> Option<&ProductLine> {
        self.lines.iter().find(|line| &line.id == id)
    }

    fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    fn next_id(&mut self) -> ProductId {
        loop {
            self.next_sequence += 1;
            let candidate = ProductId(format!("prod-{:04}", self.next_sequence));
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Appends a line under a freshly assigned id.
    pub fn add(&mut self, details: ProductDetails) -> ProductId {
        let id = self.next_id();
        debug!(product_id = %id, "product added");
        self.lines.push(ProductLine {
            id: id.clone(),
            details,
        });
        id
    }

    /// Appends a line under a caller-supplied id, rejecting duplicates.
    pub fn add_with_id(&mut self, id: ProductId, details: ProductDetails) -> Result<(), ExamError> {
        if self.contains(&id) {
            return Err(ExamError::DuplicateProduct(id));
        }
        debug!(product_id = %id, "product added");
        self.lines.push(ProductLine { id, details });
        Ok(())
    }

    /// Replaces the fields of an existing line in place.
    pub fn update(&mut self, id: &ProductId, details: ProductDetails) -> Result<(), ExamError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| &line.id == id)
            .ok_or_else(|| ExamError::ProductNotFound(id.clone()))?;
        line.details = details;
        debug!(product_id = %id, "product updated");
        Ok(())
    }

    /// Removes exactly one line; the remaining lines keep their order.
    pub fn remove(&mut self, id: &ProductId) -> Result<ProductLine, ExamError> {
        let index = self
            .lines
            .iter()
            .position(|line| &line.id == id)
            .ok_or_else(|| ExamError::ProductNotFound(id.clone()))?;
        debug!(product_id = %id, "product removed");
        Ok(self.lines.remove(index))
    }

    /// Bulk-loads a saved sequence, discarding current contents. Later
    /// duplicates of an id are dropped so the uniqueness invariant holds.
    pub fn replace_all(&mut self, lines: Vec<ProductLine>) {
        let mut seen = HashSet::new();
        self.lines = lines
            .into_iter()
            .filter(|line| {
                let fresh = seen.insert(line.id.clone());
                if !fresh {
                    warn!(product_id = %line.id, "dropping duplicate product id on load");
                }
                fresh
            })
            .collect();
        self.next_sequence = 0;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.next_sequence = 0;
    }
}
