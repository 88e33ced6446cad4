use crate::{dictionary::EpsDictionary, operand::Operand, MachineError, MachineResult, Name};
use ahash::AHashMap;

/// Resources defined by `defineresource`, grouped by category.
#[derive(Debug, Default)]
pub struct ResourceManager {
    categories: AHashMap<Name, EpsDictionary>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, category: Name, key: Operand, value: Operand) {
        self.categories
            .entry(category)
            .or_default()
            .add(key, value);
    }

    pub fn undefine(&mut self, category: &Name, key: &Operand) -> Option<Operand> {
        self.categories.get_mut(category)?.remove(key)
    }

    pub fn try_find(&self, category: &Name, key: &Operand) -> Option<&Operand> {
        self.categories.get(category)?.get(key)
    }

    pub fn find(&self, category: &Name, key: &Operand) -> MachineResult<&Operand> {
        self.try_find(category, key)
            .ok_or_else(|| MachineError::UndefinedResource {
                category: category.clone(),
                key: key.to_text().unwrap_or_default(),
            })
    }

    /// Resources of `category`, in definition order.
    ///
    /// `_template` is accepted for `resourceforall` but not applied, every
    /// resource of the category is returned.
    pub fn get_filtered_resources(
        &self,
        category: &Name,
        _template: &Operand,
    ) -> Vec<(Operand, Operand)> {
        self.categories
            .get(category)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests;
