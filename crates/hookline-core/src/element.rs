use std::fmt;

use smallvec::SmallVec;

/// Description of desired UI returned by `Component::render`.
///
/// An `Element` is plain data: a tag, a few attributes, optional text and
/// children. Nothing is drawn; the reconciler only stores the last committed
/// element per instance so callers can inspect it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: SmallVec<[(String, String); 4]>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attrs: SmallVec::new(),
            text: None,
            children: vec![],
        }
    }

    /// Output of a component that renders nothing.
    pub fn empty() -> Self {
        Element::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_empty() && self.text.is_none() && self.children.is_empty()
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key, value));
        }
        self
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, kids: Vec<Element>) -> Self {
        self.children = kids;
        self
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        if self.tag.is_empty() {
            // bare text node
            if let Some(t) = &self.text {
                f.write_str(t)?;
            }
            for c in &self.children {
                write!(f, "{c}")?;
            }
            return Ok(());
        }
        write!(f, "<{}", self.tag)?;
        for (k, v) in &self.attrs {
            write!(f, " {k}=\"{v}\"")?;
        }
        f.write_str(">")?;
        if let Some(t) = &self.text {
            f.write_str(t)?;
        }
        for c in &self.children {
            write!(f, "{c}")?;
        }
        write!(f, "</{}>", self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_markup() {
        let el = Element::new("div")
            .attr("color", "blue")
            .text("Hello")
            .child(Element::new("h1").text("x"));
        assert_eq!(el.to_string(), "<div color=\"blue\">Hello<h1>x</h1></div>");
    }

    #[test]
    fn test_attr_replaces_existing_key() {
        let el = Element::new("div").attr("type", "button").attr("type", "submit");
        assert_eq!(el.attrs.len(), 1);
        assert_eq!(el.get_attr("type"), Some("submit"));
    }

    #[test]
    fn test_empty_renders_nothing() {
        assert!(Element::empty().is_empty());
        assert_eq!(Element::empty().to_string(), "");
    }
}
