//! Recursive descent parser for layout attribute values.
//!
//! ```text
//! attr       := constraint (';' constraint)*
//! constraint := [field '='] [relation] [target ['.' anchor]] {modifier} ['@' priority]
//! ```
//!
//! Each parsed constraint is expanded over the anchors named by the attribute
//! (`edges` yields four constraints, `width` one).

use crate::layout::model::{
    Anchor, AnchorKeyword, Constraint, ConstraintTarget, LayoutError, Priority, Relation,
};
use crate::layout::tokenizer::{tokenize, Spanned, Token};

/// A single modifier call, kept unevaluated until the anchor is known.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Modifier {
    Multiplied(f64),
    Divided(f64),
    Offset(f64),
    Inset(f64),
}

/// One constraint as written, before anchor expansion.
#[derive(Debug, Clone, PartialEq)]
struct ConstraintClause {
    field: Option<String>,
    relation: Relation,
    target: ConstraintTarget,
    target_anchor: Option<(Anchor, String)>,
    modifiers: Vec<Modifier>,
    priority: Priority,
}

/// Parse the value of `layout:<attribute>` into constraints.
///
/// An empty value is shorthand for `super`.
pub fn parse_constraints(attribute: &str, value: &str) -> Result<Vec<Constraint>, LayoutError> {
    let keyword = AnchorKeyword::from_name(attribute)
        .ok_or_else(|| LayoutError::UnknownAttribute(attribute.to_string()))?;
    let tokens = tokenize(value)?;

    let mut segments: Vec<&[Spanned]> = tokens
        .split(|t| t.token == Token::Semicolon)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        segments.push(&[]);
    }

    let mut constraints = Vec::new();
    for segment in segments {
        let clause = Parser::new(segment).parse_constraint()?;
        constraints.extend(expand(attribute, keyword, &clause)?);
    }
    Ok(constraints)
}

/// Expand a parsed clause over every anchor the keyword names.
fn expand(
    attribute: &str,
    keyword: AnchorKeyword,
    clause: &ConstraintClause,
) -> Result<Vec<Constraint>, LayoutError> {
    let anchors = keyword.expansion();

    if let Some((_, text)) = &clause.target_anchor {
        if anchors.len() > 1 {
            return Err(LayoutError::AmbiguousTargetAnchor {
                attribute: attribute.to_string(),
                target_anchor: text.clone(),
            });
        }
    }
    if let ConstraintTarget::Constant(value) = clause.target {
        if anchors.iter().any(|(anchor, _)| !anchor.is_size()) {
            return Err(LayoutError::NumericTargetNotAllowed {
                attribute: attribute.to_string(),
                value: value.to_string(),
            });
        }
    }

    Ok(anchors
        .into_iter()
        .map(|(anchor, default_target_anchor)| {
            let target_anchor = match clause.target {
                ConstraintTarget::Constant(_) => None,
                _ => Some(
                    clause.target_anchor
                        .as_ref()
                        .map(|(a, _)| *a)
                        .unwrap_or(default_target_anchor),
                ),
            };

            let mut multiplier = 1.0;
            let mut constant = 0.0;
            for modifier in &clause.modifiers {
                match *modifier {
                    Modifier::Multiplied(by) => multiplier *= by,
                    Modifier::Divided(by) => multiplier /= by,
                    Modifier::Offset(amount) => constant += amount,
                    Modifier::Inset(amount) => constant += amount * anchor.inset_direction(),
                }
            }

            Constraint {
                field: clause.field.clone(),
                anchor,
                target: clause.target.clone(),
                target_anchor,
                relation: clause.relation,
                multiplier,
                constant,
                priority: clause.priority,
            }
        })
        .collect())
}

/// Recursive descent parser state over one `;`-separated segment.
struct Parser<'a> {
    tokens: &'a [Spanned],
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Self { tokens, cursor: 0 }
    }

    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.cursor)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Spanned> {
        self.tokens.get(self.cursor + n)
    }

    fn peek_is(&self, token: Token) -> bool {
        self.peek().is_some_and(|t| t.token == token)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let tok = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(tok)
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<&'a Spanned, LayoutError> {
        match self.advance() {
            Some(tok) if tok.token == expected => Ok(tok),
            Some(tok) => Err(LayoutError::UnexpectedToken(tok.text.clone())),
            None => Err(LayoutError::UnexpectedEnd(context.to_string())),
        }
    }

    fn parse_constraint(&mut self) -> Result<ConstraintClause, LayoutError> {
        let field = self.parse_field();
        let relation = self.parse_relation()?;
        let (target, explicit_target) = self.parse_target();
        let target_anchor = if explicit_target {
            self.parse_target_anchor(&target)?
        } else {
            None
        };
        let modifiers = self.parse_modifiers()?;
        let priority = self.parse_priority()?;

        if let Some(tok) = self.peek() {
            return Err(LayoutError::UnexpectedToken(tok.text.clone()));
        }

        Ok(ConstraintClause {
            field,
            relation,
            target,
            target_anchor,
            modifiers,
            priority,
        })
    }

    /// `name =` prefix capturing the constraint.
    fn parse_field(&mut self) -> Option<String> {
        match (self.peek(), self.peek_nth(1)) {
            (Some(name), Some(assign))
                if name.token == Token::Ident && assign.token == Token::Assign =>
            {
                self.cursor += 2;
                Some(name.text.clone())
            }
            _ => None,
        }
    }

    fn parse_relation(&mut self) -> Result<Relation, LayoutError> {
        match self.peek() {
            Some(tok)
                if matches!(
                    tok.token,
                    Token::EqualEqual
                        | Token::LessEqual
                        | Token::GreaterEqual
                        | Token::RelationKeyword
                ) =>
            {
                self.advance();
                Relation::from_token(&tok.text)
                    .ok_or_else(|| LayoutError::UnknownRelation(tok.text.clone()))
            }
            _ => Ok(Relation::Equal),
        }
    }

    /// Returns the target and whether it was written explicitly.
    fn parse_target(&mut self) -> (ConstraintTarget, bool) {
        let Some(tok) = self.peek() else {
            return (ConstraintTarget::Parent, false);
        };
        let followed_by_paren = self
            .peek_nth(1)
            .is_some_and(|next| next.token == Token::ParenOpen);

        let target = match tok.token {
            Token::Ident if tok.text == "super" => ConstraintTarget::Parent,
            // `offset(..)` and friends start the modifier list.
            Token::Ident if !followed_by_paren => ConstraintTarget::Field(tok.text.clone()),
            Token::LayoutId => ConstraintTarget::LayoutId(tok.text["id:".len()..].to_string()),
            Token::Number => match tok.text.parse::<f64>() {
                Ok(value) => ConstraintTarget::Constant(value),
                Err(_) => return (ConstraintTarget::Parent, false),
            },
            _ => return (ConstraintTarget::Parent, false),
        };
        self.advance();
        (target, true)
    }

    fn parse_target_anchor(
        &mut self,
        target: &ConstraintTarget,
    ) -> Result<Option<(Anchor, String)>, LayoutError> {
        if !self.peek_is(Token::Dot) {
            return Ok(None);
        }
        let dot = self.advance();
        if matches!(target, ConstraintTarget::Constant(_)) {
            return Err(LayoutError::UnexpectedToken(
                dot.map(|t| t.text.clone()).unwrap_or_default(),
            ));
        }
        let tok = self
            .advance()
            .ok_or_else(|| LayoutError::UnexpectedEnd("expected target anchor after '.'".into()))?;
        if tok.token != Token::Ident {
            return Err(LayoutError::UnknownTargetAnchor(tok.text.clone()));
        }
        Anchor::from_keyword(&tok.text)
            .map(|anchor| Some((anchor, tok.text.clone())))
            .ok_or_else(|| LayoutError::UnknownTargetAnchor(tok.text.clone()))
    }

    fn parse_modifiers(&mut self) -> Result<Vec<Modifier>, LayoutError> {
        let mut modifiers = Vec::new();
        while self.peek_is(Token::Ident) {
            let Some(name) = self.advance() else { break };
            if !self.peek_is(Token::ParenOpen) {
                return Err(LayoutError::UnexpectedToken(name.text.clone()));
            }
            let labelled = matches!(name.text.as_str(), "multiplied" | "divided");
            if !labelled && !matches!(name.text.as_str(), "offset" | "inset") {
                return Err(LayoutError::UnknownModifier(name.text.clone()));
            }
            self.advance();

            if labelled
                && self.peek().is_some_and(|t| t.token == Token::Ident && t.text == "by")
                && self.peek_nth(1).is_some_and(|t| t.token == Token::Colon)
            {
                self.cursor += 2;
            }

            let amount = self.parse_modifier_amount(&name.text)?;
            self.expect(Token::ParenClose, "expected ')' after modifier argument")?;

            modifiers.push(match name.text.as_str() {
                "multiplied" => Modifier::Multiplied(amount),
                "divided" if amount == 0.0 => {
                    return Err(LayoutError::InvalidModifier {
                        modifier: name.text.clone(),
                        fragment: "0".into(),
                    });
                }
                "divided" => Modifier::Divided(amount),
                "offset" => Modifier::Offset(amount),
                _ => Modifier::Inset(amount),
            });
        }
        Ok(modifiers)
    }

    fn parse_modifier_amount(&mut self, modifier: &str) -> Result<f64, LayoutError> {
        let tok = self.advance().ok_or_else(|| {
            LayoutError::UnexpectedEnd(format!("expected argument for `{modifier}`"))
        })?;
        let invalid = || LayoutError::InvalidModifier {
            modifier: modifier.to_string(),
            fragment: tok.text.clone(),
        };
        if tok.token != Token::Number {
            return Err(invalid());
        }
        tok.text.parse::<f64>().map_err(|_| invalid())
    }

    fn parse_priority(&mut self) -> Result<Priority, LayoutError> {
        if !self.peek_is(Token::At) {
            return Ok(Priority::Required);
        }
        self.advance();
        let tok = self
            .advance()
            .ok_or_else(|| LayoutError::UnexpectedEnd("expected priority after '@'".into()))?;
        match tok.token {
            Token::Ident | Token::Number => Priority::parse(&tok.text),
            _ => Err(LayoutError::UnknownPriority(tok.text.clone())),
        }
    }
}
