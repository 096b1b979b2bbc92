//! Staged block parser for slot templates
//!
//! Blocks are matched one directive kind at a time. For each kind a linear
//! scan counts nesting depth of that kind only: an opening token increments
//! depth, a closing token decrements it, and the close that brings depth back
//! to zero ends the block. An `{{else}}` belongs to the block being matched
//! only when it is seen at depth 1; deeper ones belong to nested blocks.
//!
//! Kinds are grouped in the order the renderer expands them. At the top
//! level loops come first, then `if`, then `unless`; inside a loop body
//! conditionals are grouped before nested loops. A stage only sees tokens
//! not already claimed by an earlier stage, so an `{{else}}` goes to the
//! first stage that finds it at depth 1.

use crate::ast::*;
use crate::lexer::{tokenize, BlockKind, Token, TokenType};
use std::collections::VecDeque;

const TOP_LEVEL_STAGES: [BlockKind; 3] = [BlockKind::Each, BlockKind::If, BlockKind::Unless];
const LOOP_BODY_STAGES: [BlockKind; 3] = [BlockKind::If, BlockKind::Unless, BlockKind::Each];

/// Work item during staged grouping
#[derive(Debug)]
enum Item {
    /// Block token not yet claimed by any stage
    Token(Token),
    Node(PartialNode),
}

#[derive(Debug)]
enum PartialNode {
    Done(TemplateNode),
    Conditional {
        condition: String,
        negated: bool,
        then_items: Vec<Item>,
        else_items: Vec<Item>,
        line: usize,
    },
}

pub struct Parser<'a> {
    source: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Template {
        let items = self.initial_items(tokenize(self.source));
        let items = self.run_stages(items, &TOP_LEVEL_STAGES);
        let nodes = self.finalize(items);

        if !self.diagnostics.is_empty() {
            log::debug!("Template parsed with {} diagnostic(s)", self.diagnostics.len());
        }

        Template {
            nodes,
            diagnostics: self.diagnostics,
        }
    }

    fn initial_items(&self, tokens: Vec<Token>) -> Vec<Item> {
        tokens
            .into_iter()
            .map(|token| match token.token_type {
                TokenType::Text(text) => Item::Node(PartialNode::Done(TemplateNode::Text(text))),
                TokenType::Variable(path) => {
                    Item::Node(PartialNode::Done(TemplateNode::Variable { path, raw: false }))
                }
                TokenType::RawVariable(path) => {
                    Item::Node(PartialNode::Done(TemplateNode::Variable { path, raw: true }))
                }
                TokenType::Translation(key) => {
                    Item::Node(PartialNode::Done(TemplateNode::Translation { key }))
                }
                _ => Item::Token(token),
            })
            .collect()
    }

    fn run_stages(&mut self, items: Vec<Item>, stages: &[BlockKind]) -> Vec<Item> {
        stages
            .iter()
            .fold(items, |items, kind| self.group(items, *kind))
    }

    /// Group all blocks of `kind`, descending into conditionals built by earlier stages
    fn group(&mut self, items: Vec<Item>, kind: BlockKind) -> Vec<Item> {
        let mut queue: VecDeque<Item> = items.into();
        let mut grouped = Vec::with_capacity(queue.len());

        while let Some(item) = queue.pop_front() {
            match item {
                Item::Token(open) if is_open(&open, kind) => match find_close(&queue, kind) {
                    Some((else_at, close_at)) => {
                        let mut body: Vec<Item> = queue.drain(..close_at).collect();
                        let close = match queue.pop_front() {
                            Some(Item::Token(close)) => close,
                            _ => unreachable!("find_close points at a close token"),
                        };
                        let else_items = match else_at {
                            Some(at) => body.split_off(at).into_iter().skip(1).collect(),
                            None => Vec::new(),
                        };
                        grouped.push(self.build_block(open, close, body, else_items, kind));
                    }
                    None => grouped.push(Item::Token(open)),
                },
                Item::Node(PartialNode::Conditional { condition, negated, then_items, else_items, line }) => {
                    grouped.push(Item::Node(PartialNode::Conditional {
                        condition,
                        negated,
                        then_items: self.group(then_items, kind),
                        else_items: self.group(else_items, kind),
                        line,
                    }));
                }
                other => grouped.push(other),
            }
        }

        grouped
    }

    fn build_block(
        &mut self,
        open: Token,
        close: Token,
        body: Vec<Item>,
        else_items: Vec<Item>,
        kind: BlockKind,
    ) -> Item {
        let argument = match open.token_type {
            TokenType::Open { argument, .. } => argument,
            _ => String::new(),
        };

        match kind {
            BlockKind::Each => {
                let body = self.run_stages(body, &LOOP_BODY_STAGES);
                Item::Node(PartialNode::Done(TemplateNode::Loop(LoopBlock {
                    path: argument,
                    body: self.finalize(body),
                    source: self.source[open.start..close.end].to_string(),
                    line: open.line,
                })))
            }
            BlockKind::If | BlockKind::Unless => {
                let then_items = self.group(body, kind);
                let else_items = self.group(else_items, kind);
                Item::Node(PartialNode::Conditional {
                    condition: argument,
                    negated: kind == BlockKind::Unless,
                    then_items,
                    else_items,
                    line: open.line,
                })
            }
        }
    }

    /// Convert work items into nodes; unclaimed tokens become literal text
    fn finalize(&mut self, items: Vec<Item>) -> Vec<TemplateNode> {
        let mut nodes: Vec<TemplateNode> = Vec::with_capacity(items.len());

        for item in items {
            let node = match item {
                Item::Token(token) => {
                    self.report_unmatched(&token);
                    TemplateNode::Text(self.source[token.start..token.end].to_string())
                }
                Item::Node(PartialNode::Done(node)) => node,
                Item::Node(PartialNode::Conditional { condition, negated, then_items, else_items, line }) => {
                    TemplateNode::Conditional(ConditionalBlock {
                        condition,
                        negated,
                        then_branch: self.finalize(then_items),
                        else_branch: self.finalize(else_items),
                        line,
                    })
                }
            };

            push_merged(&mut nodes, node);
        }

        nodes
    }

    fn report_unmatched(&mut self, token: &Token) {
        let message = match &token.token_type {
            TokenType::Open { kind, .. } => format!("unclosed {{{{#{}}}}} block", kind.name()),
            TokenType::Close(kind) => format!("unexpected {{{{/{}}}}} without a matching open", kind.name()),
            TokenType::Else => "{{else}} outside of an if/unless block".to_string(),
            other => format!("unexpected {}", other),
        };
        self.diagnostics.push(Diagnostic {
            line: token.line,
            message,
        });
    }
}

fn is_open(token: &Token, kind: BlockKind) -> bool {
    matches!(&token.token_type, TokenType::Open { kind: k, .. } if *k == kind)
}

/// Locate the matching close for a block of `kind` whose open was just popped.
///
/// Returns `(else_index, close_index)` relative to `queue`.
fn find_close(queue: &VecDeque<Item>, kind: BlockKind) -> Option<(Option<usize>, usize)> {
    let mut depth = 1usize;
    let mut else_at = None;

    for (idx, item) in queue.iter().enumerate() {
        let Item::Token(token) = item else { continue };
        match &token.token_type {
            TokenType::Open { kind: k, .. } if *k == kind => depth += 1,
            TokenType::Close(k) if *k == kind => {
                depth -= 1;
                if depth == 0 {
                    return Some((else_at, idx));
                }
            }
            // `each` takes no else; one at depth 1 stays in the loop body
            TokenType::Else if kind != BlockKind::Each && depth == 1 && else_at.is_none() => {
                else_at = Some(idx)
            }
            _ => {}
        }
    }
    None
}

/// Parse text where only variable references are live (translation output)
pub fn parse_inline_variables(source: &str) -> Vec<TemplateNode> {
    let mut nodes: Vec<TemplateNode> = Vec::new();
    for token in tokenize(source) {
        let node = match token.token_type {
            TokenType::Variable(path) => TemplateNode::Variable { path, raw: false },
            TokenType::RawVariable(path) => TemplateNode::Variable { path, raw: true },
            _ => TemplateNode::Text(source[token.start..token.end].to_string()),
        };
        push_merged(&mut nodes, node);
    }
    nodes
}

/// Append a node, folding adjacent text together
fn push_merged(nodes: &mut Vec<TemplateNode>, node: TemplateNode) {
    if let TemplateNode::Text(text) = &node {
        if let Some(TemplateNode::Text(previous)) = nodes.last_mut() {
            previous.push_str(text);
            return;
        }
    }
    nodes.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TemplateNode {
        TemplateNode::Text(s.to_string())
    }

    fn var(path: &str) -> TemplateNode {
        TemplateNode::Variable { path: path.to_string(), raw: false }
    }

    fn conditional(node: &TemplateNode) -> &ConditionalBlock {
        match node {
            TemplateNode::Conditional(block) => block,
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_static_template() {
        let template = Template::parse("<p>No directives here</p>");
        assert!(template.is_static());
        assert_eq!(template.nodes, vec![text("<p>No directives here</p>")]);
    }

    #[test]
    fn test_if_else() {
        let template = Template::parse("{{#if a}}A{{else}}B{{/if}}");
        let block = conditional(&template.nodes[0]);
        assert_eq!(block.condition, "a");
        assert!(!block.negated);
        assert_eq!(block.then_branch, vec![text("A")]);
        assert_eq!(block.else_branch, vec![text("B")]);
        assert!(template.is_well_formed());
    }

    #[test]
    fn test_nested_else_binds_to_inner_block() {
        let template = Template::parse("{{#if a}}{{#if b}}X{{else}}Y{{/if}}{{else}}Z{{/if}}");
        let outer = conditional(&template.nodes[0]);
        assert_eq!(outer.else_branch, vec![text("Z")]);
        let inner = conditional(&outer.then_branch[0]);
        assert_eq!(inner.then_branch, vec![text("X")]);
        assert_eq!(inner.else_branch, vec![text("Y")]);
    }

    #[test]
    fn test_else_claimed_by_earlier_stage() {
        // `if` is grouped before `unless`, so the else at if-depth 1 is the if's
        let template = Template::parse("{{#if a}}{{#unless b}}X{{else}}Y{{/unless}}{{/if}}");
        let block = conditional(&template.nodes[0]);
        assert_eq!(block.then_branch, vec![text("{{#unless b}}X")]);
        assert_eq!(block.else_branch, vec![text("Y{{/unless}}")]);
        assert_eq!(template.diagnostics.len(), 2);
    }

    #[test]
    fn test_unless_inside_if_branch() {
        let template = Template::parse("{{#unless b}}{{#if a}}X{{else}}Y{{/if}}{{/unless}}");
        let unless = conditional(&template.nodes[0]);
        assert!(unless.negated);
        assert!(unless.else_branch.is_empty());
        let inner = conditional(&unless.then_branch[0]);
        assert_eq!(inner.else_branch, vec![text("Y")]);
    }

    #[test]
    fn test_loop_body() {
        let template = Template::parse("<ul>{{#each items}}<li>{{this}}</li>{{/each}}</ul>");
        match &template.nodes[1] {
            TemplateNode::Loop(block) => {
                assert_eq!(block.path, "items");
                assert_eq!(block.body, vec![text("<li>"), var("this"), text("</li>")]);
                assert_eq!(block.source, "{{#each items}}<li>{{this}}</li>{{/each}}");
            }
            other => panic!("Expected loop, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_loops_and_conditionals() {
        let template = Template::parse(
            "{{#each a}}{{#if x}}{{#each b}}{{this}}{{/each}}{{else}}none{{/if}}{{/each}}",
        );
        let TemplateNode::Loop(outer) = &template.nodes[0] else { panic!("Expected loop") };
        let block = conditional(&outer.body[0]);
        assert_eq!(block.else_branch, vec![text("none")]);
        assert!(matches!(block.then_branch[0], TemplateNode::Loop(_)));
        assert!(template.is_well_formed());
    }

    #[test]
    fn test_unbalanced_directives_stay_literal() {
        let template = Template::parse("{{#if a}}open {{name}}");
        assert_eq!(template.nodes, vec![text("{{#if a}}open "), var("name")]);
        assert_eq!(template.diagnostics.len(), 1);
        assert_eq!(template.diagnostics[0].line, 1);

        let template = Template::parse("x{{/each}}\n{{else}}");
        assert_eq!(template.nodes, vec![text("x{{/each}}\n{{else}}")]);
        assert_eq!(template.diagnostics.len(), 2);
        assert_eq!(template.diagnostics[1].line, 2);
    }

    #[test]
    fn test_variable_paths() {
        let template = Template::parse("{{a}}{{#if b}}{{{c}}}{{else}}{{a}}{{/if}}");
        assert_eq!(template.variable_paths(), vec!["a", "c"]);
    }

    #[test]
    fn test_inline_variables_only() {
        let nodes = parse_inline_variables("Hi {{name}} {{#if x}}");
        assert_eq!(nodes, vec![text("Hi "), var("name"), text(" {{#if x}}")]);
    }
}
