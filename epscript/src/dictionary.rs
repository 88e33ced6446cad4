use crate::{
    name,
    operand::{Command, DictRef, Operand},
    sname,
    stack::Stack,
    MachineError, MachineResult,
};

/// Ordered key/value store. Keys are matched by a first-match linear scan
/// using operand equality, so `/a` and `(a)` address the same entry.
#[derive(Debug, Default, Clone)]
pub struct EpsDictionary {
    entries: Vec<(Operand, Operand)>,
    /// Survives scope teardown, see
    /// [`DictionaryStackHelper::remove_non_permanent_dictionaries()`].
    permanent: bool,
}

impl EpsDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_permanent() -> Self {
        Self {
            entries: vec![],
            permanent: true,
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
            permanent: false,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add entry, overwrite the value in place if key already exist.
    pub fn add(&mut self, key: Operand, value: Operand) {
        match self.entries.iter_mut().find(|(k, _)| k.key_eq(&key)) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Register a native operator under its own name.
    pub fn add_command(&mut self, c: Command) {
        self.add(Operand::name(c.name()), Operand::command(c));
    }

    pub fn get(&self, key: &Operand) -> Option<&Operand> {
        self.entries
            .iter()
            .find(|(k, _)| k.key_eq(key))
            .map(|(_, v)| v)
    }

    pub fn get_by_name(&self, key: &str) -> Option<&Operand> {
        self.get(&Operand::name(key))
    }

    /// Like `get()`, but fails with `undefined` if key not exist.
    pub fn find(&self, key: &Operand) -> MachineResult<&Operand> {
        self.get(key)
            .ok_or_else(|| MachineError::Undefined(key_name(key)))
    }

    pub fn find_by_name(&self, key: &str) -> MachineResult<&Operand> {
        self.find(&Operand::name(key))
    }

    pub fn contains_key(&self, key: &Operand) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &Operand) -> Option<Operand> {
        let idx = self.entries.iter().position(|(k, _)| k.key_eq(key))?;
        Some(self.entries.remove(idx).1)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Operand, Operand)> {
        self.entries.iter()
    }
}

impl FromIterator<(Operand, Operand)> for EpsDictionary {
    fn from_iter<T: IntoIterator<Item = (Operand, Operand)>>(iter: T) -> Self {
        let mut r = Self::new();
        for (k, v) in iter {
            r.add(k, v);
        }
        r
    }
}

/// Name used to report a missing key.
pub(crate) fn key_name(key: &Operand) -> crate::Name {
    key.text().map_or_else(|_| sname("--nostringval--"), |s| name(&s))
}

/// Name resolution over the dictionary stack, searched from top to bottom.
pub trait DictionaryStackHelper {
    /// Value of the first dictionary defining `key`.
    fn find_value(&self, key: &Operand) -> Option<Operand>;

    /// The first dictionary defining `key`.
    fn find_dictionary(&self, key: &Operand) -> Option<DictRef>;

    /// Drop every non permanent dictionary, remaining ones keep their order.
    fn remove_non_permanent_dictionaries(&mut self);
}

impl DictionaryStackHelper for Stack<DictRef> {
    fn find_value(&self, key: &Operand) -> Option<Operand> {
        self.iter()
            .rev()
            .find_map(|d| d.borrow().get(key).cloned())
    }

    fn find_dictionary(&self, key: &Operand) -> Option<DictRef> {
        self.iter()
            .rev()
            .find(|d| d.borrow().contains_key(key))
            .cloned()
    }

    fn remove_non_permanent_dictionaries(&mut self) {
        self.retain(|d| d.borrow().is_permanent());
    }
}
