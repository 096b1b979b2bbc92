//! Syntax tree for slot templates

use crate::parser::Parser;

/// Template tree node
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text, including directives that could not be matched
    Text(String),

    /// `{{path}}` (escaped) or `{{{path}}}` (raw)
    Variable { path: String, raw: bool },

    /// `{{t 'key'}}`
    Translation { key: String },

    /// `{{#each path}}...{{/each}}`
    Loop(LoopBlock),

    /// `{{#if cond}}...{{else}}...{{/if}}` and its inverted `unless` form
    Conditional(ConditionalBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopBlock {
    pub path: String,
    pub body: Vec<TemplateNode>,
    /// Original block text, emitted as-is when the nesting limit is hit
    pub source: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBlock {
    pub condition: String,
    /// `unless` blocks show `then_branch` when the condition is false
    pub negated: bool,
    pub then_branch: Vec<TemplateNode>,
    pub else_branch: Vec<TemplateNode>,
    pub line: usize,
}

/// A directive that could not be matched and was left as literal text
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub nodes: Vec<TemplateNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        Parser::new(source).parse()
    }

    /// True when the template contains no directives at all
    pub fn is_static(&self) -> bool {
        self.nodes.iter().all(|node| matches!(node, TemplateNode::Text(_)))
    }

    pub fn is_well_formed(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Variable paths referenced anywhere in the template, in order of appearance
    pub fn variable_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        collect_paths(&self.nodes, &mut paths);
        paths
    }
}

fn collect_paths<'a>(nodes: &'a [TemplateNode], paths: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            TemplateNode::Variable { path, .. } => {
                if !paths.contains(&path.as_str()) {
                    paths.push(path);
                }
            }
            TemplateNode::Loop(block) => collect_paths(&block.body, paths),
            TemplateNode::Conditional(block) => {
                collect_paths(&block.then_branch, paths);
                collect_paths(&block.else_branch, paths);
            }
            TemplateNode::Text(_) | TemplateNode::Translation { .. } => {}
        }
    }
}
