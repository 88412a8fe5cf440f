//! Virtual node descriptors.
//!
//! A `VNode` is an immutable, cheaply clonable description of desired
//! output. Descriptors carry no per-mount state; everything mutable
//! lives in the fiber tree. Pointer equality between two `VNode`s is
//! the reconciler's no-op fast path, so builders hand out `Rc`-backed
//! values and callers are free to reuse them across renders.

use std::any::TypeId;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::{Component, ComponentHandle};
use crate::error::Result;

/// Event handler stored in a prop and installed on a host node.
pub type EventHandler = Rc<dyn Fn()>;

/// Reconciliation key. Numeric keys compare numerically, string keys
/// by content; the two never compare equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Num(i64),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Rc::from(s))
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Num(n)
    }
}

/// `style` prop payload: either a raw css text or a property map.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Text(Box<str>),
    Map(IndexMap<Box<str>, Box<str>>),
}

impl StyleValue {
    /// Render to css text, the form the host attribute stores.
    pub(crate) fn to_css(&self) -> String {
        match self {
            StyleValue::Text(t) => t.to_string(),
            StyleValue::Map(m) => {
                let mut out = String::new();
                for (name, value) in m {
                    if !out.is_empty() {
                        out.push_str("; ");
                    }
                    out.push_str(name);
                    out.push_str(": ");
                    out.push_str(value);
                }
                out
            }
        }
    }
}

/// A prop (or state) value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(Box<str>),
    Style(StyleValue),
    /// `dangerously_set_inner_html`; the payload is the raw markup.
    InnerHtml(Option<Box<str>>),
    Event(EventHandler),
}

impl Value {
    /// Attribute text for the generic prop path. `None` for values
    /// that never serialize to an attribute.
    pub(crate) fn attr_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Num(n) => Some(n.to_string()),
            Value::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness as the boolean prop path sees it.
    pub(crate) fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Style(a), Value::Style(b)) => a == b,
            (Value::InnerHtml(a), Value::InnerHtml(b)) => a == b,
            // Handlers compare by identity, like any closure would.
            (Value::Event(a), Value::Event(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Num(n) => write!(f, "Num({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Style(s) => write!(f, "Style({s:?})"),
            Value::InnerHtml(h) => write!(f, "InnerHtml({h:?})"),
            Value::Event(_) => f.write_str("Event(..)"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<StyleValue> for Value {
    fn from(s: StyleValue) -> Self {
        Value::Style(s)
    }
}

thread_local! {
    static EMPTY_PROPS: Rc<Props> = Rc::new(Props::new());
    static NO_OP: VNode = VNode {
        data: Rc::new(VNodeData {
            kind: VNodeKind::Void,
            props: None,
            children: Children::None,
            class_name: None,
            key: None,
            node_ref: None,
            keyed_children: false,
            non_keyed_children: false,
        }),
    };
}

/// Ordered prop map. Component state and context reuse the same shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: IndexMap<Box<str>, Value>,
}

/// Component state: a merged map, same shape as props.
pub type State = Props;

/// Context threaded down the tree, merged at providers.
pub type Context = Rc<Props>;

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared empty sentinel. Descriptors without props resolve to
    /// this; the update path recognizes it by pointer and always
    /// re-renders, since two sentinel references carry no identity.
    pub fn empty() -> Rc<Props> {
        EMPTY_PROPS.with(Rc::clone)
    }

    pub(crate) fn is_empty_sentinel(props: &Rc<Props>) -> bool {
        EMPTY_PROPS.with(|e| Rc::ptr_eq(e, props))
    }

    /// Chainable insert, for building literals.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shallow merge: entries of `other` overwrite ours.
    pub fn merge(&mut self, other: &Props) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }
}

/// Per-instance lifecycle hooks for function components, attached
/// through [`Ref::Hooks`].
#[derive(Default)]
pub struct FnHooks {
    pub on_will_mount: Option<Box<dyn Fn()>>,
    pub on_did_mount: Option<Box<dyn Fn(Option<veld_dom::NodeId>)>>,
    pub on_should_update: Option<Box<dyn Fn(&Props, &Props) -> bool>>,
    pub on_will_update: Option<Box<dyn Fn(&Props, &Props)>>,
    pub on_did_update: Option<Box<dyn Fn(&Props, &Props)>>,
    pub on_will_unmount: Option<Box<dyn Fn(Option<veld_dom::NodeId>)>>,
}

/// Ref attachments. The variants are typed to the node they observe,
/// so a string-based registry is unrepresentable.
#[derive(Clone)]
pub enum Ref {
    /// Element callback; receives the host node on mount, `None` on
    /// unmount.
    Node(Rc<dyn Fn(Option<veld_dom::NodeId>)>),
    /// Function-component lifecycle hooks.
    Hooks(Rc<FnHooks>),
    /// Class-component instance callback.
    Instance(Rc<dyn Fn(Option<ComponentHandle>)>),
}

impl Ref {
    /// Identity compare; refs only re-fire when the callback changes.
    pub(crate) fn same(a: &Ref, b: &Ref) -> bool {
        match (a, b) {
            (Ref::Node(x), Ref::Node(y)) => Rc::ptr_eq(x, y),
            (Ref::Hooks(x), Ref::Hooks(y)) => Rc::ptr_eq(x, y),
            (Ref::Instance(x), Ref::Instance(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

/// Render function of a function component. Identity (the `Rc`
/// pointer) is the component's type for reconciliation purposes, so
/// create one of these once and reuse it.
#[derive(Clone)]
pub struct FnComponent {
    pub(crate) render: Rc<dyn Fn(&Props, &Context) -> Result<Option<VNode>>>,
}

impl FnComponent {
    pub fn new(render: impl Fn(&Props, &Context) -> Result<Option<VNode>> + 'static) -> Self {
        Self { render: Rc::new(render) }
    }

    pub(crate) fn same(a: &FnComponent, b: &FnComponent) -> bool {
        Rc::ptr_eq(&a.render, &b.render)
    }
}

/// Class component type: a factory plus the static identity used to
/// decide patch-in-place versus replace.
#[derive(Clone)]
pub struct ComponentType {
    pub(crate) type_id: TypeId,
    pub(crate) create: Rc<dyn Fn(&Props, &Context) -> Box<dyn Component>>,
    pub(crate) default_props: Option<Rc<Props>>,
}

/// Build a [`ComponentType`] from a constructor.
pub fn component_type<C, F>(create: F) -> ComponentType
where
    C: Component + 'static,
    F: Fn(&Props, &Context) -> C + 'static,
{
    ComponentType {
        type_id: TypeId::of::<C>(),
        create: Rc::new(move |props, context| Box::new(create(props, context))),
        default_props: C::default_props().map(Rc::new),
    }
}

/// Element category, resolved from the tag at build time so the
/// runtime never re-inspects tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Html,
    Svg,
    Media,
    Input,
    Textarea,
    Select,
}

impl ElementKind {
    pub(crate) fn for_tag(tag: &str) -> Self {
        match tag {
            "svg" => ElementKind::Svg,
            "input" => ElementKind::Input,
            "textarea" => ElementKind::Textarea,
            "select" => ElementKind::Select,
            "audio" | "video" => ElementKind::Media,
            _ => ElementKind::Html,
        }
    }

    /// Form elements get value/checked synchronized after generic
    /// props.
    pub(crate) fn is_form(self) -> bool {
        matches!(
            self,
            ElementKind::Input | ElementKind::Textarea | ElementKind::Select
        )
    }
}

/// What a descriptor describes.
pub enum VNodeKind {
    Text(Box<str>),
    Element { tag: Box<str>, kind: ElementKind },
    ComponentFn(FnComponent),
    ComponentClass(ComponentType),
    /// A bare child list; only valid nested under an element.
    Fragment,
    /// Placeholder that renders nothing.
    Void,
}

/// One slot in a child list. Non-keyed lists keep their nesting;
/// invisible children keep their position as holes so later siblings
/// do not shift identity.
pub enum VChild {
    Node(VNode),
    Many(Vec<VChild>),
    Hole,
}

/// Normalized children of a descriptor.
pub enum Children {
    None,
    /// Single text child; rendered through the text-content fast path
    /// and never given a fiber.
    Text(Box<str>),
    One(VNode),
    Many(Vec<VChild>),
}

impl Children {
    /// Cheap same-ness used to skip the child diff. Conservative:
    /// lists always report different.
    pub(crate) fn same(a: &Children, b: &Children) -> bool {
        match (a, b) {
            (Children::None, Children::None) => true,
            (Children::Text(x), Children::Text(y)) => x == y,
            (Children::One(x), Children::One(y)) => VNode::same(x, y),
            _ => false,
        }
    }
}

pub struct VNodeData {
    pub kind: VNodeKind,
    pub props: Option<Rc<Props>>,
    pub children: Children,
    pub class_name: Option<Box<str>>,
    pub key: Option<Key>,
    pub node_ref: Option<Ref>,
    pub keyed_children: bool,
    pub non_keyed_children: bool,
}

/// Immutable descriptor handle.
#[derive(Clone)]
pub struct VNode {
    data: Rc<VNodeData>,
}

impl VNode {
    /// Pointer identity; the reconciler's no-op fast path.
    pub fn same(a: &VNode, b: &VNode) -> bool {
        Rc::ptr_eq(&a.data, &b.data)
    }

    /// The sentinel a render can return to skip reconciliation of its
    /// output entirely.
    pub fn no_op() -> VNode {
        NO_OP.with(VNode::clone)
    }

    pub fn is_no_op(&self) -> bool {
        NO_OP.with(|n| Rc::ptr_eq(&n.data, &self.data))
    }

    /// Text descriptor.
    pub fn text(content: impl Into<Box<str>>) -> VNode {
        VNode {
            data: Rc::new(VNodeData {
                kind: VNodeKind::Text(content.into()),
                props: None,
                children: Children::None,
                class_name: None,
                key: None,
                node_ref: None,
                keyed_children: false,
                non_keyed_children: false,
            }),
        }
    }

    /// Element builder.
    pub fn element(tag: &str) -> VNodeBuilder {
        let kind = ElementKind::for_tag(tag);
        VNodeBuilder::new(VNodeKind::Element { tag: tag.into(), kind })
    }

    /// Function-component builder.
    pub fn component_fn(f: &FnComponent) -> VNodeBuilder {
        VNodeBuilder::new(VNodeKind::ComponentFn(f.clone()))
    }

    /// Class-component builder.
    pub fn component(ty: &ComponentType) -> VNodeBuilder {
        VNodeBuilder::new(VNodeKind::ComponentClass(ty.clone()))
    }

    pub fn kind(&self) -> &VNodeKind {
        &self.data.kind
    }

    pub fn props(&self) -> Option<&Rc<Props>> {
        self.data.props.as_ref()
    }

    /// Props, or the shared empty sentinel.
    pub(crate) fn props_or_empty(&self) -> Rc<Props> {
        match &self.data.props {
            Some(p) => p.clone(),
            None => Props::empty(),
        }
    }

    pub fn children(&self) -> &Children {
        &self.data.children
    }

    pub fn class_name(&self) -> Option<&str> {
        self.data.class_name.as_deref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.data.key.as_ref()
    }

    pub fn node_ref(&self) -> Option<&Ref> {
        self.data.node_ref.as_ref()
    }

    pub(crate) fn keyed_children(&self) -> bool {
        self.data.keyed_children
    }

    pub(crate) fn non_keyed_children(&self) -> bool {
        self.data.non_keyed_children
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data.kind, VNodeKind::Element { .. })
    }

    pub fn is_component(&self) -> bool {
        matches!(
            self.data.kind,
            VNodeKind::ComponentFn(_) | VNodeKind::ComponentClass(_)
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data.kind, VNodeKind::Text(_))
    }
}

impl std::fmt::Debug for VNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match &self.data.kind {
            VNodeKind::Text(t) => return write!(f, "VNode::Text({t:?})"),
            VNodeKind::Element { tag, .. } => return write!(f, "VNode::Element(<{tag}>)"),
            VNodeKind::ComponentFn(_) => "ComponentFn",
            VNodeKind::ComponentClass(_) => "ComponentClass",
            VNodeKind::Fragment => "Fragment",
            VNodeKind::Void => "Void",
        };
        write!(f, "VNode::{name}")
    }
}

/// A child as the caller writes it, before normalization.
pub enum Child {
    Node(VNode),
    Text(Box<str>),
    Num(i64),
    Bool(bool),
    Empty,
    List(Vec<Child>),
}

impl From<VNode> for Child {
    fn from(v: VNode) -> Self {
        Child::Node(v)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.into())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s.into())
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Child::Num(n)
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Bool(b)
    }
}

impl From<Option<VNode>> for Child {
    fn from(v: Option<VNode>) -> Self {
        match v {
            Some(v) => Child::Node(v),
            None => Child::Empty,
        }
    }
}

impl From<Vec<Child>> for Child {
    fn from(list: Vec<Child>) -> Self {
        Child::List(list)
    }
}

/// Builder for element and component descriptors.
pub struct VNodeBuilder {
    kind: VNodeKind,
    props: Option<Props>,
    children: Vec<Child>,
    class_name: Option<Box<str>>,
    key: Option<Key>,
    node_ref: Option<Ref>,
    keyed: bool,
    non_keyed: bool,
}

impl VNodeBuilder {
    fn new(kind: VNodeKind) -> Self {
        Self {
            kind,
            props: None,
            children: Vec::new(),
            class_name: None,
            key: None,
            node_ref: None,
            keyed: false,
            non_keyed: false,
        }
    }

    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.get_or_insert_with(Props::new).insert(name, value);
        self
    }

    /// Install an event handler prop; `event` is the lower-case name
    /// without the `on` prefix.
    pub fn on(mut self, event: &str, handler: impl Fn() + 'static) -> Self {
        let name = format!("on{event}");
        self.props
            .get_or_insert_with(Props::new)
            .insert(&name, Value::Event(Rc::new(handler)));
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        match &mut self.props {
            Some(p) => p.merge(&props),
            None => self.props = Some(props),
        }
        self
    }

    pub fn class(mut self, class_name: &str) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn node_ref(mut self, r: Ref) -> Self {
        self.node_ref = Some(r);
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: Vec<Child>) -> Self {
        self.children.extend(children);
        self
    }

    /// Declare the child list keyed; every child must carry a key and
    /// the list is flattened up front.
    pub fn keyed(mut self) -> Self {
        self.keyed = true;
        self
    }

    /// Declare the child list non-keyed, forcing the positional diff
    /// even when children happen to carry keys.
    pub fn non_keyed(mut self) -> Self {
        self.non_keyed = true;
        self
    }

    pub fn build(self) -> Result<VNode> {
        let mut props = self.props.map(Rc::new);
        if let VNodeKind::ComponentClass(ty) = &self.kind {
            if let Some(defaults) = &ty.default_props {
                let mut merged = match &props {
                    Some(p) => (**p).clone(),
                    None => Props::new(),
                };
                for (name, value) in defaults.iter() {
                    if !merged.contains(name) {
                        merged.insert(name, value.clone());
                    }
                }
                props = Some(Rc::new(merged));
            }
        }
        let children = crate::normalize::normalize_children(self.children, self.keyed)?;
        Ok(VNode {
            data: Rc::new(VNodeData {
                kind: self.kind,
                props,
                children,
                class_name: self.class_name,
                key: self.key,
                node_ref: self.node_ref,
                keyed_children: self.keyed,
                non_keyed_children: self.non_keyed,
            }),
        })
    }
}
