//! Statement, declaration and function parsers.

use nom::{
    branch::alt,
    character::complete::digit1,
    combinator::{map, map_res, opt},
    multi::separated_list0,
    sequence::terminated,
};

use super::{
    error::{fail, PResult, SyntaxError},
    primitives::{expect, identifier, keyword, symbol},
    whitespace::blank,
    Parser, Raw,
};
use crate::{
    ast::{NodeKind, NodeValue, StorageQualifier},
    types::VarType,
};

impl Parser<'_> {
    /// Parse top-level items until the end of input.
    pub(crate) fn program<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let mut root = Raw::new(NodeKind::StatementList, 0);
        let mut input = input;
        while !input.is_empty() {
            if let Ok((rest, _)) = symbol(";")(input) {
                input = rest;
                continue;
            }
            let (rest, item) = self.item(input)?;
            root.children.push(item);
            input = rest;
        }
        Ok((input, root))
    }

    /// Parse statements until the end of input.
    pub(crate) fn statements<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let mut list = Raw::new(NodeKind::StatementList, self.offset(input));
        let mut input = input;
        while !input.is_empty() {
            let (rest, stmt) = self.statement(input)?;
            list.children.extend(stmt);
            input = rest;
        }
        Ok((input, list))
    }

    /// A function definition or a (possibly qualified) declaration.
    fn item<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);
        let (input, qualifier) = opt(storage_qualifier)(input)?;
        let (input, _) = self.reject_unknown_type(input)?;
        let (input, ty) = match self.type_name(input) {
            Ok(res) => res,
            Err(_) => return fail(SyntaxError::expected(input, "a declaration or function")),
        };
        let name_start = self.offset(input);
        let (input, name) = match identifier(input) {
            Ok(res) => res,
            Err(_) => return fail(SyntaxError::expected(input, "a name")),
        };

        if qualifier.is_none() && input.starts_with('(') {
            return self.function(input, start, ty, name);
        }

        let (input, mut decl) = self.declaration_rest(input, start, ty, name, name_start)?;
        if let (Some(q), Some(ty_node)) = (qualifier, decl.children.first_mut()) {
            ty_node.qualifier = Some(q);
        }
        Ok((input, decl))
    }

    fn function<'i>(&self, input: &'i str, start: usize, ret: VarType, name: &str) -> PResult<'i, Raw> {
        let params_start = self.offset(input);
        let (input, _) = symbol("(")(input)?;
        let (input, params) = separated_list0(symbol(","), |i| self.parameter(i))(input)?;
        let (input, _) = expect(")")(input)?;
        if !input.starts_with('{') {
            return fail(SyntaxError::expected(input, "'{'"));
        }
        let (input, body) = self.block(input)?;

        let func = Raw::new(NodeKind::Function, start)
            .with_value(NodeValue::Name(name.to_string()))
            .with_child(Raw::var_type(ret, start))
            .with_child(Raw::new(NodeKind::ParamList, params_start).with_children(params))
            .with_child(body);
        Ok((input, func))
    }

    fn parameter<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);
        let (input, _) = self.reject_unknown_type(input)?;
        let (input, ty) = self.type_name(input)?;
        let (input, name) = match identifier(input) {
            Ok(res) => res,
            Err(_) => return fail(SyntaxError::expected(input, "a parameter name")),
        };
        let (input, ty) = self.array_suffix(input, ty)?;
        Ok((
            input,
            Raw::new(NodeKind::VarDecl, start)
                .with_value(NodeValue::Name(name.to_string()))
                .with_child(Raw::var_type(ty, start)),
        ))
    }

    /// `[N]` / `[]` after a declared name, then optional initializer and `;`.
    fn declaration_rest<'i>(
        &self,
        input: &'i str,
        start: usize,
        ty: VarType,
        name: &str,
        name_start: usize,
    ) -> PResult<'i, Raw> {
        let (input, ty) = self.array_suffix(input, ty)?;
        let mut decl = Raw::new(NodeKind::VarDecl, name_start)
            .with_value(NodeValue::Name(name.to_string()))
            .with_child(Raw::var_type(ty, start));

        let input = match symbol("=")(input) {
            Ok((rest, _)) if !rest.starts_with('=') => {
                let (rest, init) = self.required_expression(rest)?;
                decl.children.push(init);
                rest
            }
            _ => input,
        };
        let (input, _) = expect(";")(input)?;
        Ok((input, decl))
    }

    fn array_suffix<'i>(&self, input: &'i str, ty: VarType) -> PResult<'i, VarType> {
        let Ok((input, _)) = symbol("[")(input) else {
            return Ok((input, ty));
        };
        let (input, size) = opt(terminated(
            map_res(digit1, |s: &str| s.parse::<usize>()),
            blank,
        ))(input)?;
        let (input, _) = expect("]")(input)?;
        let ty = match size {
            Some(size) => VarType::array(ty, size),
            None => VarType::dynamic_array(ty),
        };
        Ok((input, ty))
    }

    /// A registered type name.
    fn type_name<'i>(&self, input: &'i str) -> PResult<'i, VarType> {
        let (rest, name) = identifier(input)?;
        match self.ctx.get_type(name) {
            Some(ty) => Ok((rest, ty.clone())),
            None => Err(nom::Err::Error(SyntaxError::expected(input, "a type"))),
        }
    }

    /// Parse `{ ... }` into a `StatementList`.
    fn block<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);
        let (mut input, _) = symbol("{")(input)?;
        let mut list = Raw::new(NodeKind::StatementList, start);
        loop {
            if let Ok((rest, _)) = symbol("}")(input) {
                return Ok((rest, list));
            }
            if input.is_empty() {
                return fail(SyntaxError::expected(input, "'}'"));
            }
            let (rest, stmt) = self.statement(input)?;
            list.children.extend(stmt);
            input = rest;
        }
    }

    /// One statement; `None` for an empty statement.
    pub(crate) fn statement<'i>(&self, input: &'i str) -> PResult<'i, Option<Raw>> {
        let start = self.offset(input);

        if input.starts_with('{') {
            return map(|i| self.block(i), Some)(input);
        }
        if let Ok((rest, _)) = symbol(";")(input) {
            return Ok((rest, None));
        }
        if let Ok((rest, _)) = keyword("return")(input) {
            let (rest, value) = opt(|i| self.expression(i))(rest)?;
            let (rest, _) = expect(";")(rest)?;
            let ret = Raw::new(NodeKind::Return, start).with_children(value);
            return Ok((rest, Some(ret)));
        }
        if let Ok((rest, _)) = keyword("if")(input) {
            return map(|i| self.if_rest(i, start), Some)(rest);
        }
        if storage_qualifier(input).is_ok() {
            return fail(SyntaxError::message(
                input,
                "storage qualifiers are only allowed on top-level declarations",
            ));
        }

        let (input, _) = self.reject_unknown_type(input)?;
        if let Ok((rest, ty)) = self.type_name(input) {
            let name_start = self.offset(rest);
            if let Ok((rest, name)) = identifier(rest) {
                let (rest, decl) = self.declaration_rest(rest, start, ty, name, name_start)?;
                return Ok((rest, Some(decl)));
            }
        }

        let (input, expr) = self.required_expression(input)?;
        let (input, _) = expect(";")(input)?;
        Ok((input, Some(expr)))
    }

    fn if_rest<'i>(&self, input: &'i str, start: usize) -> PResult<'i, Raw> {
        let (input, _) = expect("(")(input)?;
        let (input, cond) = self.required_expression(input)?;
        let (input, _) = expect(")")(input)?;
        let (input, then) = self.branch(input)?;

        let mut node = Raw::new(NodeKind::If, start)
            .with_child(cond)
            .with_child(then);

        let input = match keyword("else")(input) {
            Ok((rest, _)) => {
                let else_start = self.offset(rest);
                let (rest, otherwise) = match keyword("if")(rest) {
                    Ok((rest, _)) => self.if_rest(rest, else_start)?,
                    Err(_) => self.branch(rest)?,
                };
                node.children.push(otherwise);
                rest
            }
            Err(_) => input,
        };
        Ok((input, node))
    }

    /// A branch body, always a `StatementList`.
    fn branch<'i>(&self, input: &'i str) -> PResult<'i, Raw> {
        let start = self.offset(input);
        if input.starts_with('{') {
            return self.block(input);
        }
        if input.is_empty() {
            return fail(SyntaxError::expected(input, "a statement"));
        }
        let (input, stmt) = self.statement(input)?;
        Ok((input, Raw::new(NodeKind::StatementList, start).with_children(stmt)))
    }
}

fn storage_qualifier(input: &str) -> PResult<'_, StorageQualifier> {
    alt((
        map(keyword("in"), |_| StorageQualifier::In),
        map(keyword("out"), |_| StorageQualifier::Out),
        map(keyword("uniform"), |_| StorageQualifier::Uniform),
    ))(input)
}
