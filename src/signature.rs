//! Canonicalization of member-expression chains.
//!
//! A chain like `this.constants.lut[0]` reduces to the canonical string
//! `this.constants.value[]`; only the shapes in [`SIGNATURES`] are
//! recognized. Anything else is an unhandled shape.

use crate::ast::{MemberProperty, Node};
use crate::diagnostic::Diagnostic;
use crate::kernel::KernelFunction;
use crate::span::Spanned;
use crate::types::Ty;

/// The recognized access shapes.
pub const SIGNATURES: [&str; 14] = [
    "value",
    "value[]",
    "value[][]",
    "value[][][]",
    "value.value",
    "this.thread.value",
    "this.output.value",
    "this.constants.value",
    "this.constants.value[]",
    "this.constants.value[][]",
    "this.constants.value[][][]",
    "fn()[]",
    "fn()[][]",
    "fn()[][][]",
];

/// Vector channel properties resolved when decomposing `value.value`.
pub const COLOR_CHANNELS: [&str; 4] = ["r", "g", "b", "a"];

/// Reserved suffix tokens that keep their own fragment.
const RESERVED_PROPERTIES: [&str; 3] = ["constants", "thread", "output"];

/// Reduce a member-expression chain to its canonical signature, or `None`
/// for an unrecognized shape.
pub fn signature_of(node: &Spanned<Node>) -> Option<String> {
    let mut fragments = Vec::new();
    collect_fragments(node, &mut fragments)?;
    let joined = fragments.join("");
    if SIGNATURES.contains(&joined.as_str()) {
        Some(joined)
    } else {
        None
    }
}

fn collect_fragments(node: &Spanned<Node>, out: &mut Vec<&'static str>) -> Option<()> {
    match &node.node {
        Node::Member { object, property } => {
            collect_fragments(object, out)?;
            match property {
                MemberProperty::Computed(_) => out.push("[]"),
                MemberProperty::Named(name) => match name.node.as_str() {
                    "constants" => out.push(".constants"),
                    "thread" => out.push(".thread"),
                    "output" => out.push(".output"),
                    _ => out.push(".value"),
                },
            }
            Some(())
        }
        Node::This => {
            out.push("this");
            Some(())
        }
        Node::Identifier(_) => {
            out.push("value");
            Some(())
        }
        Node::Call { .. } => {
            out.push("fn()");
            Some(())
        }
        _ => None,
    }
}

/// Where a decomposed member access originates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    User,
    Constants,
    Math,
}

/// Structured decomposition of a recognized member access.
///
/// Index expressions are kept as raw AST sub-nodes so backends can emit
/// them with their own rules; `x_property` is the innermost (last) bracket,
/// `y_property` and `z_property` the ones before it.
#[derive(Clone, Debug)]
pub struct MemberDetail<'a> {
    pub name: String,
    pub origin: Origin,
    pub signature: String,
    pub ty: Option<Ty>,
    pub x_property: Option<&'a Spanned<Node>>,
    pub y_property: Option<&'a Spanned<Node>>,
    pub z_property: Option<&'a Spanned<Node>>,
    /// Named scalar property, for `value.value` accesses.
    pub property: Option<String>,
}

impl KernelFunction {
    /// Decompose a recognized member expression into its semantic parts.
    ///
    /// A missing underlying name, or a constant without a registered type,
    /// is a fatal diagnostic.
    pub fn member_detail<'a>(
        &mut self,
        node: &'a Spanned<Node>,
    ) -> Result<MemberDetail<'a>, Diagnostic> {
        // Math constants and intrinsic references short-circuit.
        if let Node::Member { object, property } = &node.node {
            if let (Node::Identifier(base), MemberProperty::Named(name)) = (&object.node, property)
            {
                if base == "Math" {
                    let ty = self.infer_type(node)?;
                    return Ok(MemberDetail {
                        name: name.node.clone(),
                        origin: Origin::Math,
                        signature: "value.value".to_string(),
                        ty,
                        x_property: None,
                        y_property: None,
                        z_property: None,
                        property: None,
                    });
                }
            }
        }

        let signature = match signature_of(node) {
            Some(signature) => signature,
            None => {
                return Err(self.ast_error("unhandled member expression signature", node.span))
            }
        };
        let ty = self.infer_type(node)?;

        let (base, indices) = split_indices(node);
        let mut detail = MemberDetail {
            name: String::new(),
            origin: Origin::User,
            signature,
            ty,
            x_property: None,
            y_property: None,
            z_property: None,
            property: None,
        };
        // Innermost bracket is the x dimension.
        let mut rev = indices.iter().rev();
        detail.x_property = rev.next().copied();
        detail.y_property = rev.next().copied();
        detail.z_property = rev.next().copied();

        let name = match detail.signature.as_str() {
            "value" | "value[]" | "value[][]" | "value[][][]" => identifier_name(base),
            "value.value" => {
                if let Node::Member { object, property } = &base.node {
                    if let MemberProperty::Named(prop) = property {
                        detail.property = Some(prop.node.clone());
                    }
                    identifier_name(object)
                } else {
                    None
                }
            }
            "this.thread.value" | "this.output.value" => named_property(base),
            "this.constants.value"
            | "this.constants.value[]"
            | "this.constants.value[][]"
            | "this.constants.value[][][]" => {
                detail.origin = Origin::Constants;
                named_property(base)
            }
            "fn()[]" | "fn()[][]" | "fn()[][][]" => {
                if let Node::Call { callee, .. } = &base.node {
                    identifier_name(callee)
                } else {
                    None
                }
            }
            _ => None,
        };

        detail.name = match name {
            Some(name) => name,
            None => {
                return Err(
                    self.ast_error("member expression has no underlying name", node.span)
                )
            }
        };
        Ok(detail)
    }
}

/// Strip computed accesses off the chain, returning the base node and the
/// index expressions in outer-to-inner source order.
fn split_indices(node: &Spanned<Node>) -> (&Spanned<Node>, Vec<&Spanned<Node>>) {
    let mut indices = Vec::new();
    let mut current = node;
    while let Node::Member {
        object,
        property: MemberProperty::Computed(index),
    } = &current.node
    {
        indices.push(&**index);
        current = &**object;
    }
    indices.reverse();
    (current, indices)
}

fn identifier_name(node: &Spanned<Node>) -> Option<String> {
    match &node.node {
        Node::Identifier(name) => Some(name.clone()),
        _ => None,
    }
}

fn named_property(node: &Spanned<Node>) -> Option<String> {
    match &node.node {
        Node::Member {
            property: MemberProperty::Named(name),
            ..
        } => Some(name.node.clone()),
        _ => None,
    }
}
