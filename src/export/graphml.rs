//! GraphML serialization
//!
//! Writes the graph with a typed `<key>` declaration for every node and edge
//! attribute so visualization tools (Gephi, yEd, Cytoscape) import it without
//! manual mapping.

use crate::graph::NetworkGraph;
use std::fmt::Write;

const NODE_KEYS: &[(&str, &str, &str)] = &[
    ("d0", "name", "string"),
    ("d1", "type", "string"),
    ("d2", "org_id", "string"),
    ("d3", "location", "string"),
    ("d4", "classification_code", "string"),
    ("d5", "asset_band", "string"),
    ("d6", "revenue_band", "string"),
];

const EDGE_KEYS: &[(&str, &str, &str)] = &[
    ("d7", "weight", "double"),
    ("d8", "years", "string"),
    ("d9", "grant_count", "int"),
];

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn key_for(name: &str) -> &'static str {
    NODE_KEYS
        .iter()
        .find(|(_, n, _)| *n == name)
        .map(|(id, _, _)| *id)
        .unwrap_or("d0")
}

/// Serialize the graph as a GraphML document.
///
/// Node ids are `funder:<id>` / `recipient:<id>`; edges run funder to recipient.
pub fn to_graphml(graph: &NetworkGraph) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_document(graph, &mut out);
    out
}

fn write_document(graph: &NetworkGraph, out: &mut String) -> std::fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#
    )?;
    for (id, name, ty) in NODE_KEYS {
        writeln!(
            out,
            r#"  <key id="{}" for="node" attr.name="{}" attr.type="{}"/>"#,
            id, name, ty
        )?;
    }
    for (id, name, ty) in EDGE_KEYS {
        writeln!(
            out,
            r#"  <key id="{}" for="edge" attr.name="{}" attr.type="{}"/>"#,
            id, name, ty
        )?;
    }
    writeln!(out, r#"  <graph id="G" edgedefault="directed">"#)?;

    for node in graph.nodes() {
        writeln!(out, r#"    <node id="{}">"#, escape(&node.key.to_string()))?;
        writeln!(out, r#"      <data key="d0">{}</data>"#, escape(&node.name))?;
        writeln!(out, r#"      <data key="d1">{}</data>"#, node.kind())?;
        writeln!(out, r#"      <data key="d2">{}</data>"#, escape(node.org_id().as_str()))?;
        for (name, value) in node.attributes.entries() {
            writeln!(out, r#"      <data key="{}">{}</data>"#, key_for(name), escape(value))?;
        }
        writeln!(out, "    </node>")?;
    }

    for edge in graph.edges() {
        let (Some(funder), Some(recipient)) = (graph.node(edge.funder), graph.node(edge.recipient))
        else {
            continue;
        };
        let years: Vec<String> = edge.years.iter().map(|y| y.to_string()).collect();
        writeln!(
            out,
            r#"    <edge id="e{}" source="{}" target="{}">"#,
            edge.id.as_u64(),
            escape(&funder.key.to_string()),
            escape(&recipient.key.to_string())
        )?;
        writeln!(out, r#"      <data key="d7">{}</data>"#, edge.weight)?;
        writeln!(out, r#"      <data key="d8">{}</data>"#, years.join(","))?;
        writeln!(out, r#"      <data key="d9">{}</data>"#, edge.grant_count)?;
        writeln!(out, "    </edge>")?;
    }

    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")?;
    Ok(())
}
