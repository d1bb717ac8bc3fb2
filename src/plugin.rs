//! Dispatch from type tags to the formulations which implement them.
//!
//! Each kind of entity in a model (projects, transmission lines, policies and so on) is assigned
//! one or more type tags, e.g. a project's capacity type. For every kind of tag there is a trait
//! describing what a formulation for that kind must provide, and each tag value maps to one
//! implementation of the trait.
//!
//! Formulations are only loaded for the tags which are actually used in a model.
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use std::fmt::Display;
use std::hash::Hash;

/// A type tag which selects a formulation
pub trait TypeTag: Copy + Eq + Hash + Display {
    /// The interface implemented by formulations for this kind of tag
    type Plugin: ?Sized;

    /// A human-readable name for the kind of tag (used in messages)
    const KIND: &'static str;

    /// Create a new instance of the formulation for this tag
    fn load_plugin(self) -> Box<Self::Plugin>;
}

/// The formulations loaded for one kind of tag, keyed by tag
pub struct PluginSet<T: TypeTag> {
    plugins: IndexMap<T, Box<T::Plugin>>,
}

impl<T: TypeTag> PluginSet<T> {
    /// Load a formulation for every distinct tag in `tags`.
    ///
    /// Each formulation is loaded once, in the order in which its tag first appears.
    pub fn load(tags: impl IntoIterator<Item = T>) -> Self {
        let mut plugins = IndexMap::new();
        for tag in tags {
            plugins.entry(tag).or_insert_with(|| {
                debug!("Loading formulation for {} '{tag}'", T::KIND);
                tag.load_plugin()
            });
        }

        Self { plugins }
    }

    /// Get the formulation for a tag
    pub fn get(&self, tag: T) -> Result<&T::Plugin> {
        self.plugins
            .get(&tag)
            .map(|plugin| &**plugin)
            .with_context(|| format!("No formulation loaded for {} '{tag}'", T::KIND))
    }

    /// Get the formulation for a tag mutably
    pub fn get_mut(&mut self, tag: T) -> Result<&mut T::Plugin> {
        self.plugins
            .get_mut(&tag)
            .map(|plugin| &mut **plugin)
            .with_context(|| format!("No formulation loaded for {} '{tag}'", T::KIND))
    }

    /// The tags for which formulations have been loaded
    pub fn tags(&self) -> impl Iterator<Item = T> + '_ {
        self.plugins.keys().copied()
    }

    /// The number of loaded formulations
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no formulations have been loaded
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Iterate over the loaded formulations
    pub fn iter(&self) -> impl Iterator<Item = (T, &T::Plugin)> {
        self.plugins.iter().map(|(tag, plugin)| (*tag, &**plugin))
    }

    /// Iterate mutably over the loaded formulations
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (T, &mut T::Plugin)> {
        self.plugins
            .iter_mut()
            .map(|(tag, plugin)| (*tag, &mut **plugin))
    }
}

/// Group entities by their tag, keeping the order in which tags first appear
pub fn group_by_tag<'a, E, T, F>(entities: impl IntoIterator<Item = &'a E>, tag_of: F) -> IndexMap<T, Vec<&'a E>>
where
    E: ?Sized + 'a,
    T: TypeTag,
    F: Fn(&E) -> T,
{
    let mut groups: IndexMap<T, Vec<&'a E>> = IndexMap::new();
    for entity in entities {
        groups.entry(tag_of(entity)).or_default().push(entity);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use itertools::Itertools;

    trait Describe {
        fn describe(&self) -> String;
        fn increment(&mut self);
    }

    #[derive(Default)]
    struct Counter(u32);

    impl Describe for Counter {
        fn describe(&self) -> String {
            format!("counter at {}", self.0)
        }

        fn increment(&mut self) {
            self.0 += 1;
        }
    }

    struct Fixed;

    impl Describe for Fixed {
        fn describe(&self) -> String {
            "fixed".into()
        }

        fn increment(&mut self) {}
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
    enum Shape {
        #[strum(serialize = "counter")]
        Counter,
        #[strum(serialize = "fixed")]
        Fixed,
    }

    impl TypeTag for Shape {
        type Plugin = dyn Describe;
        const KIND: &'static str = "shape";

        fn load_plugin(self) -> Box<dyn Describe> {
            match self {
                Self::Counter => Box::<Counter>::default(),
                Self::Fixed => Box::new(Fixed),
            }
        }
    }

    #[test]
    fn test_load_only_used_tags() {
        let plugins = PluginSet::load([Shape::Fixed, Shape::Fixed]);
        assert_eq!(plugins.tags().collect_vec(), vec![Shape::Fixed]);
        assert_eq!(plugins.get(Shape::Fixed).unwrap().describe(), "fixed");
        assert_error!(
            plugins.get(Shape::Counter),
            "No formulation loaded for shape 'counter'"
        );
    }

    #[test]
    fn test_plugin_state_is_shared_between_entities() {
        let mut plugins = PluginSet::load([Shape::Counter, Shape::Fixed, Shape::Counter]);
        assert_eq!(plugins.len(), 2);

        plugins.get_mut(Shape::Counter).unwrap().increment();
        plugins.get_mut(Shape::Counter).unwrap().increment();
        assert_eq!(
            plugins.get(Shape::Counter).unwrap().describe(),
            "counter at 2"
        );

        for (_, plugin) in plugins.iter_mut() {
            plugin.increment();
        }
        assert_eq!(
            plugins.iter().map(|(_, p)| p.describe()).collect_vec(),
            vec!["counter at 3", "fixed"]
        );
    }

    #[test]
    fn test_group_by_tag() {
        let entities = [("a", Shape::Fixed), ("b", Shape::Counter), ("c", Shape::Fixed)];
        let groups = group_by_tag(&entities, |(_, tag)| *tag);
        assert_eq!(groups.keys().copied().collect_vec(), vec![Shape::Fixed, Shape::Counter]);
        assert_eq!(groups[&Shape::Fixed].iter().map(|(id, _)| *id).collect_vec(), vec!["a", "c"]);
    }
}
