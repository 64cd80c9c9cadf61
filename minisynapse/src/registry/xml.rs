//! XML sequence documents.
//!
//! ```xml
//! <sequence name="main">
//!   <log level="INFO" message="received"/>
//!   <filter expr="ctx.method == 'POST'">
//!     <send url="http://upstream.test/echo"/>
//!   </filter>
//! </sequence>
//! ```
//!
//! Element names match without regard to ASCII case. Attribute names are
//! exact. Text, comments and processing instructions between elements are
//! ignored.

use super::definition::{
    FilterDefinition, LogDefinition, MediatorDefinition, SendDefinition, SequenceDefinition,
};
use crate::errors::ConfigError;
use roxmltree::{Document, Node};
use std::fmt::Display;

/// Deepest `<filter>` nesting an XML document may declare.
pub const MAX_FILTER_DEPTH: usize = 64;

/// Reads an XML document into a [`SequenceDefinition`].
pub(super) fn parse(raw: &str, source_id: &str) -> Result<SequenceDefinition, ConfigError> {
    let doc = Document::parse(raw).map_err(|e| ConfigError::new(source_id, e.to_string()))?;
    let root = doc.root_element();
    let reader = Reader { source_id };

    if !root.tag_name().name().eq_ignore_ascii_case("sequence") {
        return Err(reader.error(
            root,
            format!(
                "root element of {source_id} must be <sequence>, found <{}>",
                root.tag_name().name()
            ),
        ));
    }
    reader.check_attributes(root, &["name"])?;

    Ok(SequenceDefinition {
        name: root.attribute("name").map(str::to_string),
        mediators: reader.mediators(root, 0)?,
    })
}

struct Reader<'s> {
    source_id: &'s str,
}

impl Reader<'_> {
    fn mediators(&self, parent: Node<'_, '_>, depth: usize) -> Result<Vec<MediatorDefinition>, ConfigError> {
        parent
            .children()
            .filter(Node::is_element)
            .map(|child| self.mediator(child, depth))
            .collect()
    }

    fn mediator(&self, node: Node<'_, '_>, depth: usize) -> Result<MediatorDefinition, ConfigError> {
        let tag = node.tag_name().name();
        match tag.to_ascii_lowercase().as_str() {
            "log" => {
                self.check_attributes(node, &["level", "message"])?;
                self.check_leaf(node, tag)?;
                Ok(MediatorDefinition::Log(LogDefinition {
                    level: node.attribute("level").map(str::to_string),
                    message: node.attribute("message").map(str::to_string),
                }))
            }
            "send" => {
                self.check_attributes(node, &["url", "destination"])?;
                self.check_leaf(node, tag)?;
                let url = match (node.attribute("url"), node.attribute("destination")) {
                    (Some(url), None) | (None, Some(url)) => url,
                    (Some(_), Some(_)) => {
                        return Err(self.error(node, "<send> takes either url or destination, not both"))
                    }
                    (None, None) => return Err(self.error(node, "<send> requires a url attribute")),
                };
                Ok(MediatorDefinition::Send(SendDefinition {
                    url: url.to_string(),
                }))
            }
            "filter" => {
                self.check_attributes(node, &["expr"])?;
                let expr = node
                    .attribute("expr")
                    .ok_or_else(|| self.error(node, "<filter> requires an expr attribute"))?;
                if depth >= MAX_FILTER_DEPTH {
                    return Err(self.error(
                        node,
                        format!("filters nested too deeply (limit {MAX_FILTER_DEPTH})"),
                    ));
                }
                Ok(MediatorDefinition::Filter(FilterDefinition {
                    expr: expr.to_string(),
                    mediators: self.mediators(node, depth + 1)?,
                }))
            }
            _ => Err(self.error(node, format!("unknown mediator type <{tag}>"))),
        }
    }

    fn check_attributes(&self, node: Node<'_, '_>, allowed: &[&str]) -> Result<(), ConfigError> {
        match node.attributes().find(|a| !allowed.contains(&a.name())) {
            Some(attr) => Err(self.error(
                node,
                format!("unknown attribute '{}' on <{}>", attr.name(), node.tag_name().name()),
            )),
            None => Ok(()),
        }
    }

    fn check_leaf(&self, node: Node<'_, '_>, tag: &str) -> Result<(), ConfigError> {
        if node.children().any(|c| c.is_element()) {
            return Err(self.error(node, format!("<{tag}> cannot contain mediators")));
        }
        Ok(())
    }

    fn error(&self, node: Node<'_, '_>, message: impl Display) -> ConfigError {
        let pos = node.document().text_pos_at(node.range().start);
        ConfigError::new(
            self.source_id,
            format!("{message} (line {}, column {})", pos.row, pos.col),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn log(message: &str) -> MediatorDefinition {
        MediatorDefinition::Log(LogDefinition {
            level: None,
            message: Some(message.to_string()),
        })
    }

    #[test]
    fn test_mixed_case_tags() {
        let raw = r#"<Sequence name="main">
            <LOG message="first"/>
            <Send destination="http://a.test/"/>
        </Sequence>"#;

        let parsed = parse(raw, "main.xml").unwrap();

        assert_eq!(parsed.name.as_deref(), Some("main"));
        assert_eq!(
            parsed.mediators,
            vec![
                log("first"),
                MediatorDefinition::Send(SendDefinition {
                    url: "http://a.test/".to_string()
                })
            ]
        );
    }

    #[test]
    fn test_nested_filters_keep_order() {
        let raw = r#"<?xml version="1.0"?>
<!-- routing -->
<sequence>
  <filter expr="ctx.method == 'POST'">
    <log message="outer"/>
    <filter expr="'x-tenant' in ctx.headers">
      some text
      <log message="inner"/>
    </filter>
  </filter>
  <log message="after"/>
</sequence>"#;

        let parsed = parse(raw, "routes.xml").unwrap();

        assert_eq!(parsed.name, None);
        assert_eq!(
            parsed.mediators,
            vec![
                MediatorDefinition::Filter(FilterDefinition {
                    expr: "ctx.method == 'POST'".to_string(),
                    mediators: vec![
                        log("outer"),
                        MediatorDefinition::Filter(FilterDefinition {
                            expr: "'x-tenant' in ctx.headers".to_string(),
                            mediators: vec![log("inner")],
                        }),
                    ],
                }),
                log("after"),
            ]
        );
    }

    #[test]
    fn test_entities_in_attributes() {
        let parsed = parse(
            r#"<sequence><filter expr="ctx.properties['n'] &lt; 3"/><log message="a &amp; b"/></sequence>"#,
            "e.xml",
        )
        .unwrap();

        assert_eq!(
            parsed.mediators,
            vec![
                MediatorDefinition::Filter(FilterDefinition {
                    expr: "ctx.properties['n'] < 3".to_string(),
                    mediators: vec![],
                }),
                log("a & b"),
            ]
        );
    }

    #[test]
    fn test_wrong_root_names_the_file() {
        let err = parse(r#"<pipeline><log/></pipeline>"#, "conf/legacy.xml").unwrap_err();

        assert_eq!(err.source_id, "conf/legacy.xml");
        assert!(err.message.contains("root element of conf/legacy.xml must be <sequence>"));
        assert!(err.message.contains("<pipeline>"));
    }

    #[test]
    fn test_unknown_tag_reports_position() {
        let raw = "<sequence>\n  <log/>\n  <enrich key=\"a\"/>\n</sequence>";

        let err = parse(raw, "bad.xml").unwrap_err();

        assert!(err.message.contains("unknown mediator type <enrich>"));
        assert!(err.message.contains("line 3"));
    }

    #[test]
    fn test_rejects_bad_attributes_and_children() {
        let cases = [
            (r#"<sequence><send/></sequence>"#, "requires a url"),
            (r#"<sequence><send url="http://a/" destination="http://b/"/></sequence>"#, "not both"),
            (r#"<sequence><filter><log/></filter></sequence>"#, "requires an expr"),
            (r#"<sequence><log colour="red"/></sequence>"#, "unknown attribute 'colour'"),
            (r#"<sequence title="x"/>"#, "unknown attribute 'title'"),
            (r#"<sequence><log><log/></log></sequence>"#, "cannot contain mediators"),
        ];

        for (raw, needle) in cases {
            let err = parse(raw, "bad.xml").unwrap_err();
            assert!(err.message.contains(needle), "{raw}: {}", err.message);
        }
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse("<sequence><log></sequence>", "broken.xml").unwrap_err();
        assert_eq!(err.source_id, "broken.xml");
    }

    #[test]
    fn test_filter_depth_limit() {
        let nest = |n: usize| {
            let mut raw = String::from("<sequence>");
            raw.push_str(&"<filter expr=\"true\">".repeat(n));
            raw.push_str(&"</filter>".repeat(n));
            raw.push_str("</sequence>");
            raw
        };

        assert!(parse(&nest(MAX_FILTER_DEPTH), "ok.xml").is_ok());
        let err = parse(&nest(MAX_FILTER_DEPTH + 1), "deep.xml").unwrap_err();
        assert!(err.message.contains("filters nested too deeply"));
        assert!(parse(&nest(100_000), "deeper.xml").is_err());
    }
}
