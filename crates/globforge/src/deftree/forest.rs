use std::fmt;

use derive_more::{Deref, DerefMut};

use super::{Param, ROOT_SCOPE, Scope, ScopeObserver};

/// A parameter tagged with the definition file it was declared in.
#[derive(Clone, Debug, PartialEq)]
pub struct ForestParam {
    pub param: Param,
    pub filename: String,
}

impl AsRef<Param> for ForestParam {
    fn as_ref(&self) -> &Param {
        &self.param
    }
}

impl fmt::Display for ForestParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.param.fmt(f)
    }
}

/// Several [`DefTree`](super::DefTree)s merged into one hierarchy.
///
/// Trees are added by walking them into the forest; scopes with the same path unify.
#[derive(Debug, Deref, DerefMut)]
pub struct DefForest {
    #[deref]
    #[deref_mut]
    root: Scope<ForestParam>,
    filename: String,
    path: Vec<String>,
    depth: usize,
}

impl Default for DefForest {
    fn default() -> Self {
        DefForest {
            root: Scope::new(ROOT_SCOPE),
            filename: String::new(),
            path: vec![],
            depth: 0,
        }
    }
}

impl DefForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tree(&mut self, tree: &super::DefTree) {
        tree.walk(self);
    }

    fn current(&mut self) -> &mut Scope<ForestParam> {
        let mut scope = &mut self.root;
        for name in &self.path {
            scope = scope.add_child_scope(name);
        }
        scope
    }
}

impl ScopeObserver<Param> for DefForest {
    fn on_def_begin(&mut self, filename: &str) {
        self.filename = filename.to_string();
        self.path.clear();
        self.depth = 0;
    }

    fn on_scope_begin(&mut self, name: &str, description: Option<&str>) {
        // Each tree's root maps onto the forest root
        if self.depth > 0 {
            self.path.push(name.to_string());
        }
        self.depth += 1;
        if let Some(description) = description {
            self.current().set_description(description);
        }
    }

    fn on_param(&mut self, param: &Param) {
        let tagged = ForestParam {
            param: param.clone(),
            filename: self.filename.clone(),
        };
        self.current().add_param(tagged);
    }

    fn on_scope_end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            self.path.pop();
        }
    }
}

#[cfg(test)]
mod test {
    use crate::deftree::{DefForest, DefTree, ForestParam, Param, ParamType, PrintObserver, Scope, by_name, by_text};
    use pretty_assertions::assert_eq;

    fn trees() -> (DefTree, DefTree) {
        let mut one = DefTree::new("one.def");
        one.get_scope("/A/B").add_param(Param::new("ZED", ParamType::Int));
        one.get_scope("/Z").add_param(Param::new("Z1", ParamType::Bool));

        let mut two = DefTree::new("two.def");
        two.get_scope("/A/B").add_param(Param::new("ALPHA", ParamType::Int).with_title("Alpha"));
        two.get_scope("/A").set_description("from two");
        two.add_param(Param::new("TOP", ParamType::String));
        (one, two)
    }

    #[test]
    fn scopes_merge_by_name() {
        let (one, two) = trees();
        let mut forest = DefForest::new();
        forest.add_tree(&one);
        forest.add_tree(&two);

        assert_eq!(forest.children().map(Scope::name).collect::<Vec<_>>(), vec!["A", "Z"]);
        let b = forest.find_scope("A/B").unwrap();
        let tagged: Vec<_> = b
            .params()
            .iter()
            .map(|p| (p.param.id.as_str(), p.filename.as_str()))
            .collect();
        assert_eq!(tagged, vec![("ZED", "one.def"), ("ALPHA", "two.def")]);
        assert_eq!(forest.find_scope("A").unwrap().description(), "from two");
        assert_eq!(forest.params()[0].filename, "two.def");
    }

    #[test]
    fn sorted_walk() {
        let (one, two) = trees();
        let mut forest = DefForest::new();
        two.walk(&mut forest);
        one.walk(&mut forest);

        let mut printer = PrintObserver::new();
        forest.walk_sorted(&mut printer, Some(&by_name::<ForestParam>), Some(&by_text::<ForestParam>));
        assert_eq!(
            printer.output(),
            r#"/:
  A:
    <description>={
      from two
    }
    B:
      id=ALPHA type=INT title=Alpha
      id=ZED type=INT
  Z:
    id=Z1 type=BOOL
  id=TOP type=STRING
"#
        );
    }
}
