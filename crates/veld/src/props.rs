//! Prop application and diffing.
//!
//! Props fall into categories with distinct host behavior: skipped
//! names the reconciler owns, boolean and strict DOM properties,
//! event handlers, style, raw markup, and the generic attribute path.
//! Equal old and new values short-circuit before any categorization.

use veld_dom::{Document, NodeId, PropertyValue};

use crate::error::{Error, Result};
use crate::vnode::{ElementKind, Props, Value};

/// Names handled elsewhere in the reconciler; never written to the
/// host.
const SKIP_PROPS: &[&str] = &["children", "ref", "key", "class", "className"];

/// Written as boolean DOM properties rather than attributes.
const BOOLEAN_PROPS: &[&str] = &[
    "allowfullscreen",
    "autofocus",
    "autoplay",
    "capture",
    "checked",
    "controls",
    "default",
    "disabled",
    "hidden",
    "loop",
    "multiple",
    "muted",
    "novalidate",
    "open",
    "readonly",
    "required",
    "reversed",
    "selected",
];

/// Read back before writing: user interaction may have moved the live
/// value, and a blind write would clobber cursor state.
const STRICT_PROPS: &[&str] = &["value", "volume"];

/// SVG attributes that live in a foreign namespace.
const NAMESPACED_ATTRS: &[&str] = &[
    "xlink:actuate",
    "xlink:arcrole",
    "xlink:href",
    "xlink:role",
    "xlink:show",
    "xlink:title",
    "xlink:type",
    "xml:base",
    "xml:lang",
    "xml:space",
];

/// Apply one prop transition. `last` is `None` on mount.
pub(crate) fn patch_prop(
    doc: &mut Document,
    dom: NodeId,
    name: &str,
    last: Option<&Value>,
    next: &Value,
    svg: bool,
    has_controlled_value: bool,
) -> Result<()> {
    if last == Some(next) {
        return Ok(());
    }
    if SKIP_PROPS.contains(&name) {
        return Ok(());
    }
    // Controlled value is synchronized by the form pass, not here.
    if has_controlled_value && name == "value" {
        return Ok(());
    }
    if BOOLEAN_PROPS.contains(&name) {
        doc.set_property(dom, name, PropertyValue::Bool(next.truthy()))?;
        return Ok(());
    }
    if STRICT_PROPS.contains(&name) {
        let text: Box<str> = match next {
            Value::Null => "".into(),
            other => other.attr_text().unwrap_or_default().into(),
        };
        let unchanged = matches!(
            doc.property(dom, name),
            Some(PropertyValue::Str(cur)) if *cur == text
        );
        if !unchanged {
            doc.set_property(dom, name, PropertyValue::Str(text))?;
        }
        return Ok(());
    }
    if let Some(event) = name.strip_prefix("on") {
        return patch_event(doc, dom, name, event, next);
    }
    match next {
        Value::Null => {
            doc.remove_attribute(dom, name)?;
        }
        Value::Style(style) => {
            let css = style.to_css();
            let unchanged = matches!(
                last,
                Some(Value::Style(prev)) if prev.to_css() == css
            );
            if !unchanged {
                doc.set_attribute(dom, "style", &css)?;
            }
        }
        Value::InnerHtml(markup) => {
            let Some(markup) = markup else {
                return Err(Error::MissingRawMarkup);
            };
            let unchanged = matches!(
                last,
                Some(Value::InnerHtml(Some(prev))) if prev == markup
            );
            if !unchanged {
                doc.set_raw_html(dom, markup)?;
            }
        }
        Value::Event(_) => {
            // An Event value under a non-`on` name is a usage error.
            return Err(Error::InvalidEventHandler(name.into()));
        }
        other => {
            if let Some(text) = other.attr_text() {
                // Namespaced attributes only exist on svg elements;
                // the host stores them under their qualified name.
                if NAMESPACED_ATTRS.contains(&name) && !svg {
                    return Ok(());
                }
                doc.set_attribute(dom, name, &text)?;
            }
        }
    }
    Ok(())
}

fn patch_event(
    doc: &mut Document,
    dom: NodeId,
    name: &str,
    event: &str,
    next: &Value,
) -> Result<()> {
    match next {
        Value::Event(handler) => {
            doc.set_event_handler(dom, event, handler.clone())?;
            Ok(())
        }
        Value::Null => {
            doc.remove_event_handler(dom, event)?;
            Ok(())
        }
        _ => Err(Error::InvalidEventHandler(name.into())),
    }
}

/// Remove a prop that is absent from the next props.
pub(crate) fn remove_prop(
    doc: &mut Document,
    dom: NodeId,
    name: &str,
    kind: ElementKind,
) -> Result<()> {
    if SKIP_PROPS.contains(&name) {
        return Ok(());
    }
    if name == "value" {
        // A select with no value must report null, not empty string.
        let cleared = if kind == ElementKind::Select {
            PropertyValue::Null
        } else {
            PropertyValue::Str("".into())
        };
        doc.set_property(dom, "value", cleared)?;
        return Ok(());
    }
    if BOOLEAN_PROPS.contains(&name) {
        doc.set_property(dom, name, PropertyValue::Bool(false))?;
        return Ok(());
    }
    if let Some(event) = name.strip_prefix("on") {
        doc.remove_event_handler(dom, event)?;
        return Ok(());
    }
    if name == "style" {
        doc.remove_attribute(dom, "style")?;
        return Ok(());
    }
    doc.remove_attribute(dom, name)?;
    Ok(())
}

/// Whether the element's form state is driven by props.
pub(crate) fn is_controlled(kind: ElementKind, props: &Props) -> bool {
    match kind {
        ElementKind::Input => {
            props.get("value").is_some_and(|v| !v.is_null())
                || props.get("checked").is_some()
        }
        ElementKind::Textarea | ElementKind::Select => {
            props.get("value").is_some_and(|v| !v.is_null())
        }
        _ => false,
    }
}

/// Synchronize value/checked after the generic prop pass. Runs for
/// form elements only.
pub(crate) fn process_form_element(
    doc: &mut Document,
    dom: NodeId,
    kind: ElementKind,
    props: &Props,
    mounting: bool,
    controlled: bool,
) -> Result<()> {
    if controlled {
        if let Some(value) = props.get("value") {
            if !value.is_null() {
                let text = value.attr_text().unwrap_or_default();
                doc.set_property(dom, "value", PropertyValue::Str(text.into()))?;
            }
        }
        if kind == ElementKind::Input {
            if let Some(checked) = props.get("checked") {
                doc.set_property(dom, "checked", PropertyValue::Bool(checked.truthy()))?;
            }
        }
    } else if mounting {
        // Uncontrolled elements seed their value once.
        if let Some(value) = props.get("defaultValue") {
            if let Some(text) = value.attr_text() {
                doc.set_property(dom, "value", PropertyValue::Str(text.into()))?;
            }
        }
    }
    Ok(())
}
