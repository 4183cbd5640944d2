use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reference to an output produced by an upstream task.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredOutput {
    pub task_name: String,
    pub output_path: String,
}

impl RequiredOutput {
    pub fn new(task_name: impl Into<String>, output_path: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            output_path: output_path.into(),
        }
    }
}

/// An arbitrarily nested structure of items: a single item, a list, or a
/// named map. Upstream requirements of a task come in this shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flattenable<T> {
    Item(T),
    List(Vec<Flattenable<T>>),
    Map(BTreeMap<String, Flattenable<T>>),
}

impl<T> Flattenable<T> {
    /// Collect every leaf item, depth first. Map entries are visited in key
    /// order.
    pub fn flatten(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Item(item) => out.push(item),
            Self::List(items) => items.iter().for_each(|i| i.collect_into(out)),
            Self::Map(items) => items.values().for_each(|i| i.collect_into(out)),
        }
    }

    /// Apply `f` to every leaf, preserving the nesting.
    pub fn map<U, F>(&self, f: F) -> Flattenable<U>
    where
        F: Fn(&T) -> U,
    {
        self.map_with(&f)
    }

    fn map_with<U, F>(&self, f: &F) -> Flattenable<U>
    where
        F: Fn(&T) -> U,
    {
        match self {
            Self::Item(item) => Flattenable::Item(f(item)),
            Self::List(items) => Flattenable::List(items.iter().map(|i| i.map_with(f)).collect()),
            Self::Map(items) => Flattenable::Map(
                items
                    .iter()
                    .map(|(k, v)| (k.clone(), v.map_with(f)))
                    .collect(),
            ),
        }
    }

    /// A flat list of items.
    pub fn list(items: impl IntoIterator<Item = T>) -> Self {
        Self::List(items.into_iter().map(Self::Item).collect())
    }

    /// Returns `true` if no leaf items exist.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Item(_) => false,
            Self::List(items) => items.iter().all(Flattenable::is_empty),
            Self::Map(items) => items.values().all(Flattenable::is_empty),
        }
    }
}

impl<T> From<T> for Flattenable<T> {
    fn from(item: T) -> Self {
        Self::Item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Flattenable<i32> {
        let mut inner = BTreeMap::new();
        inner.insert("e".to_string(), Flattenable::Item(5));
        let mut b = BTreeMap::new();
        b.insert("c".to_string(), Flattenable::Item(4));
        b.insert("d".to_string(), Flattenable::Map(inner));
        let mut root = BTreeMap::new();
        root.insert(
            "a".to_string(),
            Flattenable::List(vec![1.into(), 2.into(), 3.into()]),
        );
        root.insert("b".to_string(), Flattenable::Map(b));
        Flattenable::Map(root)
    }

    #[test]
    fn flatten_single_item() {
        assert_eq!(Flattenable::Item(42).flatten(), vec![&42]);
    }

    #[test]
    fn flatten_nested_list() {
        let value = Flattenable::List(vec![
            Flattenable::Item("foo"),
            Flattenable::List(vec!["bar".into(), "troll".into()]),
        ]);
        assert_eq!(value.flatten(), vec![&"foo", &"bar", &"troll"]);
    }

    #[test]
    fn flatten_nested_map() {
        assert_eq!(nested().flatten(), vec![&1, &2, &3, &4, &5]);
    }

    #[test]
    fn map_preserves_shape() {
        let mapped = nested().map(|v| v.to_string());
        let flat: Vec<&String> = mapped.flatten();
        assert_eq!(flat, vec!["1", "2", "3", "4", "5"]);
        match mapped {
            Flattenable::Map(m) => assert!(matches!(m["b"], Flattenable::Map(_))),
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn empty_structures() {
        assert!(Flattenable::<i32>::List(vec![]).is_empty());
        assert!(Flattenable::<i32>::Map(BTreeMap::new()).is_empty());
        assert!(!Flattenable::list(vec![1]).is_empty());
    }

    #[test]
    fn required_outputs_serialize_untagged() {
        let outputs = Flattenable::list(vec![RequiredOutput::new("A", "a.json")]);
        let json = serde_json::to_string(&outputs).unwrap();
        assert_eq!(json, r#"[{"task_name":"A","output_path":"a.json"}]"#);
    }
}
