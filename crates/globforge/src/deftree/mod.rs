//! Nested scopes of typed configuration parameters.
//!
//! A [`DefTree`] is the result of parsing one definition file. Its root scope is named `/`;
//! child scopes are created on demand by [`Scope::get_scope`]. A [`DefForest`] merges several
//! trees into one hierarchy, remembering which file each parameter came from.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use derive_more::{Deref, DerefMut};
use indexmap::IndexMap;

use globforge_util::split::split_filter_empty;

use crate::errors::BuildError;

mod forest;
mod observer;
mod param;

pub use forest::{DefForest, ForestParam};
pub use observer::{PrintObserver, RelevantParam, RelevantParamMatcher, ScopeObserver};
pub use param::{Choice, EnumMetadata, Param, ParamType, ParamValue};

pub const ROOT_SCOPE: &str = "/";

pub type SortFn<'a, T> = &'a dyn Fn(&T, &T) -> Ordering;

#[derive(Clone, Debug, PartialEq)]
pub struct Scope<P = Param> {
    name: String,
    description: Option<String>,
    children: IndexMap<String, Scope<P>>,
    params: Vec<P>,
}

impl<P> Scope<P> {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Scope {
            name: name.into(),
            description: None,
            children: IndexMap::new(),
            params: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accumulated description; empty if never set.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Set the description, or append to it after a blank line if one is already present.
    pub fn set_description<S: AsRef<str>>(&mut self, text: S) {
        match &mut self.description {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(text.as_ref());
            }
            None => self.description = Some(text.as_ref().to_string()),
        }
    }

    pub fn children(&self) -> impl Iterator<Item = &Scope<P>> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&Scope<P>> {
        self.children.get(name)
    }

    pub fn params(&self) -> &[P] {
        &self.params
    }

    /// Get the named child scope, creating it if needed.
    pub fn add_child_scope(&mut self, name: &str) -> &mut Scope<P> {
        self.children
            .entry(name.to_string())
            .or_insert_with(|| Scope::new(name))
    }

    pub fn add_param(&mut self, param: P) -> &P {
        self.params.push(param);
        &self.params[self.params.len() - 1]
    }

    /// Resolve a `/`-separated path below this scope, creating any missing scopes. Leading
    /// and trailing slashes are optional; an empty path is this scope.
    pub fn get_scope(&mut self, path: &str) -> &mut Scope<P> {
        let mut scope = self;
        for node in split_filter_empty(path, "/") {
            scope = scope.add_child_scope(node);
        }
        scope
    }

    /// Like [`Scope::get_scope`] but never creates anything.
    pub fn find_scope(&self, path: &str) -> Option<&Scope<P>> {
        let mut scope = self;
        for node in split_filter_empty(path, "/") {
            scope = scope.children.get(node)?;
        }
        Some(scope)
    }

    /// Visit child scopes (before parameters), depth first, in insertion order.
    pub fn walk<O: ScopeObserver<P> + ?Sized>(&self, observer: &mut O) {
        self.walk_sorted(observer, None, None);
    }

    pub fn walk_sorted<O: ScopeObserver<P> + ?Sized>(
        &self,
        observer: &mut O,
        child_sorter: Option<SortFn<Scope<P>>>,
        param_sorter: Option<SortFn<P>>,
    ) {
        observer.on_scope_begin(&self.name, self.description.as_deref());

        let mut children: Vec<_> = self.children.values().collect();
        if let Some(sorter) = child_sorter {
            children.sort_by(|a, b| sorter(a, b));
        }
        for child in children {
            child.walk_sorted(observer, child_sorter, param_sorter);
        }

        let mut params: Vec<_> = self.params.iter().collect();
        if let Some(sorter) = param_sorter {
            params.sort_by(|a, b| sorter(a, b));
        }
        for param in params {
            observer.on_param(param);
        }

        observer.on_scope_end();
    }
}

/// Sort scopes by name.
pub fn by_name<P>(a: &Scope<P>, b: &Scope<P>) -> Ordering {
    a.name().cmp(b.name())
}

/// Sort parameters by their display text.
pub fn by_text<P: AsRef<Param>>(a: &P, b: &P) -> Ordering {
    a.as_ref().text().cmp(b.as_ref().text())
}

/// The parameter tree of one definition file.
#[derive(Clone, Debug, PartialEq, Deref, DerefMut)]
pub struct DefTree {
    filename: PathBuf,
    #[deref]
    #[deref_mut]
    root: Scope,
}

impl DefTree {
    pub fn new<P: Into<PathBuf>>(filename: P) -> Self {
        DefTree {
            filename: filename.into(),
            root: Scope::new(ROOT_SCOPE),
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    pub fn walk<O: ScopeObserver<Param> + ?Sized>(&self, observer: &mut O) {
        observer.on_def_begin(&self.filename.display().to_string());
        self.root.walk(observer);
    }

    /// Every parameter with its value in `settings`, in walk order. Fails if any parameter has
    /// no value.
    pub fn get_relevant_params(
        &self,
        settings: &globforge_settings::Settings,
    ) -> Result<Vec<RelevantParam>, BuildError> {
        let mut matcher = RelevantParamMatcher::new(settings);
        self.walk(&mut matcher);
        matcher.into_params()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pa() -> Param {
        Param::new("IDENTIFIER_A", ParamType::Bool).with_title("Value A")
    }

    fn pb() -> Param {
        Param::new("IDENTIFIER_B", ParamType::String).with_title("Value B")
    }

    fn pc() -> Param {
        Param::new("IDENTIFIER_C", ParamType::Int)
    }

    #[test]
    fn flat() {
        let mut tree = DefTree::new("test.def");
        tree.add_param(pa());
        tree.add_param(pb());
        tree.add_param(pc());

        assert_eq!(tree.name(), "/");
        assert_eq!(tree.filename(), Path::new("test.def"));
        assert_eq!(tree.params(), &[pa(), pb(), pc()]);
        assert_eq!(tree.get_scope("/").name(), "/");
        assert_eq!(tree.get_scope("").params().len(), 3);
    }

    #[test]
    fn nested() {
        let mut tree = DefTree::new("");
        tree.add_child_scope("scope_a").add_param(pa());
        tree.add_child_scope("scope_b").add_param(pb());
        tree.set_description("top");
        let scope_c = tree.add_child_scope("scope_c");
        scope_c.add_param(pc());
        let scope_abc = scope_c.add_child_scope("scope_abc");
        scope_abc.add_param(pa());
        scope_abc.set_description("123");

        assert_eq!(tree.description(), "top");
        assert!(tree.params().is_empty());
        assert_eq!(tree.child("scope_a").unwrap().description(), "");
        assert_eq!(tree.get_scope("scope_b/").name(), "scope_b");
        assert_eq!(tree.get_scope("/scope_c/scope_abc").params(), &[pa()]);

        tree.get_scope("scope_c/scope_abc").set_description("456");
        tree.get_scope("/scope_c/scope_abc/").set_description("789");
        assert_eq!(
            tree.find_scope("scope_c/scope_abc").unwrap().description(),
            "123\n\n456\n\n789"
        );
        assert_eq!(tree.children().map(Scope::name).collect::<Vec<_>>(), vec![
            "scope_a", "scope_b", "scope_c"
        ]);
    }

    #[test]
    fn lazy_scopes_are_stable() {
        let mut tree = DefTree::new("x.def");
        let first: *const Scope = tree.get_scope("/a/b/c");
        assert_eq!(tree.get_scope("/a/b/c").name(), "c");
        let second: *const Scope = tree.get_scope("a/b/c/");
        assert!(std::ptr::eq(first, second));
        assert_eq!(tree.find_scope("/a").unwrap().children().count(), 1);
        assert!(tree.find_scope("/a/x").is_none());
    }
}
