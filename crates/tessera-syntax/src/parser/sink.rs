//! Sink for converting parser events into a Rowan green tree.

use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};

use crate::error::{BuilderError, ParseError};
use crate::lexer::Token;
use crate::parser::event::{ErrorSpan, Event};
use crate::syntax_kind::SyntaxKind;

/// Converts parser events and tokens into a Rowan syntax tree.
pub struct Sink<'t, 's> {
    builder: GreenNodeBuilder<'static>,
    text: &'s str,
    tokens: &'t [Token],
    cursor: usize,
    events: Vec<Event>,
    /// Start offset of every open node.
    open: Vec<TextSize>,
    offset: TextSize,
    last_token: Option<TextRange>,
    errors: Vec<ParseError>,
}

impl<'t, 's> Sink<'t, 's> {
    pub fn new(text: &'s str, tokens: &'t [Token], events: Vec<Event>) -> Self {
        Self {
            builder: GreenNodeBuilder::new(),
            text,
            tokens,
            cursor: 0,
            events,
            open: Vec::new(),
            offset: TextSize::new(0),
            last_token: None,
            errors: Vec::new(),
        }
    }

    /// Consume the sink and build the syntax tree.
    ///
    /// # Panics
    ///
    /// With a [`BuilderError::Unbalanced`] if the events do not describe a
    /// single well-nested tree over every token.
    pub fn finish(mut self) -> (GreenNode, Vec<ParseError>) {
        // Process forward_parent links to create proper tree structure
        let mut forward_parents = Vec::new();

        for i in 0..self.events.len() {
            match std::mem::replace(&mut self.events[i], Event::Placeholder) {
                Event::Start {
                    kind,
                    forward_parent,
                } => {
                    // Collect forward parent chain
                    forward_parents.push(kind);
                    let mut fp = forward_parent;

                    while let Some(parent_idx) = fp {
                        match std::mem::replace(&mut self.events[parent_idx], Event::Placeholder) {
                            Event::Start {
                                kind,
                                forward_parent,
                            } => {
                                fp = forward_parent;
                                forward_parents.push(kind);
                            }
                            _ => unbalanced("forward parent is not a node start"),
                        }
                    }

                    // Start nodes in reverse order (outermost first)
                    for kind in forward_parents.drain(..).rev() {
                        self.builder.start_node(kind.into());
                        self.open.push(self.offset);
                    }
                }
                Event::Token { kind } => self.token(kind),
                Event::Finish => {
                    if self.open.pop().is_none() {
                        unbalanced("finish without a matching start");
                    }
                    self.builder.finish_node();
                }
                Event::Error { message, span } => {
                    let range = match span {
                        ErrorSpan::Empty => TextRange::empty(self.offset),
                        ErrorSpan::Node => {
                            let start = self.open.last().copied().unwrap_or(self.offset);
                            TextRange::new(start, self.offset)
                        }
                        ErrorSpan::LastToken => self
                            .last_token
                            .unwrap_or_else(|| TextRange::empty(self.offset)),
                    };
                    self.errors.push(ParseError::new(message, range));
                }
                Event::Placeholder => {}
            }
        }

        if !self.open.is_empty() {
            unbalanced("node left open");
        }
        if self.cursor != self.tokens.len() {
            unbalanced("tokens left outside the tree");
        }

        (self.builder.finish(), self.errors)
    }

    fn token(&mut self, kind: SyntaxKind) {
        let Some(&token) = self.tokens.get(self.cursor) else {
            unbalanced("more token events than tokens");
        };
        if self.open.is_empty() {
            unbalanced("token outside the root node");
        }
        self.builder.token(kind.into(), &self.text[token.range]);
        self.cursor += 1;
        self.offset = token.range.end();
        self.last_token = Some(token.range);
    }
}

fn unbalanced(what: &'static str) -> ! {
    panic!("{}", BuilderError::Unbalanced(what))
}
