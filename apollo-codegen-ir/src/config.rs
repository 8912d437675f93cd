#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct IrBuilderConfig {
    /// When to add a `__typename` field to the field sets of composite fields that do not select
    /// it already. Polymorphic models cannot be read back without it.
    ///
    /// Defaults to [`AddTypename::IfPolymorphic`].
    pub add_typename: AddTypename,

    /// Whether to build the implementation model group of every named fragment, in addition to
    /// its interface model group. Implementations are only needed by emitters that can read a
    /// fragment on its own.
    ///
    /// Defaults to true.
    pub generate_fragment_implementations: bool,

    /// Whether to give every model of an operation or fragment a name that is unique across the
    /// whole model tree, for emitters that generate all models in a single namespace. Colliding
    /// names get an integer suffix, in traversal order.
    ///
    /// Defaults to false.
    pub flatten_models: bool,
}

impl Default for IrBuilderConfig {
    fn default() -> Self {
        Self {
            add_typename: AddTypename::IfPolymorphic,
            generate_fragment_implementations: true,
            flatten_models: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum AddTypename {
    Never,
    /// Only for fields whose type is an interface or a union, or that have more than one shape.
    #[default]
    IfPolymorphic,
    Always,
}

impl AddTypename {
    pub(crate) fn applies(self, is_polymorphic: bool) -> bool {
        match self {
            Self::Never => false,
            Self::IfPolymorphic => is_polymorphic,
            Self::Always => true,
        }
    }
}
