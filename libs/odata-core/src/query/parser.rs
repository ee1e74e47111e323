use super::{ExpandItem, ExpandOption, Levels, QueryOptions, SelectOption};
use crate::edm::{Edm, EdmStructuredType, EdmType, FullQualifiedName};
use crate::limits::ODataLimits;
use crate::{Error, ResourceKind};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// Parse a query string (without the leading `?`) without consulting a model.
///
/// System options keep their literal `$`; anything else lands in
/// [`QueryOptions::custom`].
///
/// # Errors
/// `InvalidQueryOption` for unknown or repeated system options, malformed
/// values, `$levels` outside `$expand` and limit violations.
pub fn parse_query(raw: &str, limits: &ODataLimits) -> Result<QueryOptions, Error> {
    let mut options = QueryOptions::default();
    let mut seen: Vec<String> = Vec::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = decode(name, "query option name")?;
        let value = decode(value, &name)?;
        if !name.starts_with('$') {
            options.custom.push((name, value));
            continue;
        }
        if seen.contains(&name) {
            return Err(Error::query(&name, "specified more than once"));
        }
        if name == "$levels" {
            return Err(Error::query(&name, "only allowed inside $expand"));
        }
        apply(&mut options, &name, &value, 1, limits)?;
        seen.push(name);
    }
    Ok(options)
}

/// [`parse_query`] followed by [`QueryOptions::validate`] against `target`.
///
/// # Errors
/// See both functions.
pub fn parse_query_for(
    edm: &Edm,
    target: &EdmStructuredType,
    raw: &str,
    limits: &ODataLimits,
) -> Result<QueryOptions, Error> {
    let options = parse_query(raw, limits)?;
    options.validate(edm, target, limits)?;
    Ok(options)
}

fn decode(text: &str, option: &str) -> Result<String, Error> {
    percent_decode_str(text)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| Error::query(option, "invalid percent-encoding"))
}

/// `depth` is the expand level the options belong to (1 = request level).
fn apply(
    options: &mut QueryOptions,
    name: &str,
    value: &str,
    depth: u32,
    limits: &ODataLimits,
) -> Result<(), Error> {
    match name {
        "$select" => options.select = Some(parse_select(value, limits)?),
        "$expand" => options.expand = Some(parse_expand(value, depth, limits)?),
        "$count" => options.count = Some(parse_bool(name, value)?),
        "$levels" => options.levels = Some(parse_levels(value, limits)?),
        "$search" => {
            limits.validate_search(value)?;
            options.search = Some(non_empty(name, value)?);
        }
        "$filter" => options.filter = Some(non_empty(name, value)?),
        "$orderby" => options.orderby = Some(non_empty(name, value)?),
        "$top" => options.top = Some(parse_u64(name, value)?),
        "$skip" => options.skip = Some(parse_u64(name, value)?),
        "$skiptoken" => options.skiptoken = Some(non_empty(name, value)?),
        "$id" => options.id = Some(non_empty(name, value)?),
        "$format" => options.format = Some(non_empty(name, value)?),
        _ => return Err(Error::query(name, "unknown system query option")),
    }
    Ok(())
}

fn non_empty(name: &str, value: &str) -> Result<String, Error> {
    if value.trim().is_empty() {
        return Err(Error::query(name, "value must not be empty"));
    }
    Ok(value.to_owned())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(Error::query(name, format!("expected true or false, got `{other}`"))),
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64, Error> {
    value
        .parse()
        .map_err(|_| Error::query(name, format!("expected a non-negative integer, got `{value}`")))
}

fn parse_levels(value: &str, limits: &ODataLimits) -> Result<Levels, Error> {
    if value.eq_ignore_ascii_case("max") {
        return Ok(Levels::Max);
    }
    let depth: u32 = value
        .parse()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| Error::query("$levels", format!("expected a positive integer or max, got `{value}`")))?;
    if depth > limits.max_expand_depth {
        return Err(Error::query(
            "$levels",
            format!("exceeds maximum depth of {}", limits.max_expand_depth),
        ));
    }
    Ok(Levels::Depth(depth))
}

fn parse_select(value: &str, limits: &ODataLimits) -> Result<SelectOption, Error> {
    let mut select = SelectOption::new();
    for item in split_top_level(value, ',').ok_or_else(|| unbalanced("$select"))? {
        let item = item.trim();
        if item.is_empty() {
            return Err(Error::query("$select", "empty item"));
        }
        if !select.insert(item) {
            return Err(Error::query("$select", format!("`{item}` selected more than once")));
        }
    }
    limits.validate_select_items(select.len())?;
    Ok(select)
}

fn parse_expand(value: &str, depth: u32, limits: &ODataLimits) -> Result<ExpandOption, Error> {
    limits.validate_expand_depth(depth)?;
    let mut expand = ExpandOption::new();
    for raw in split_top_level(value, ',').ok_or_else(|| unbalanced("$expand"))? {
        let raw = raw.trim();
        let (path, nested) = match raw.find('(') {
            Some(open) => {
                let inner = raw[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| unbalanced("$expand"))?;
                (&raw[..open], Some(inner))
            }
            None => (raw, None),
        };
        let (path, is_ref) = match path.strip_suffix("/$ref") {
            Some(path) => (path, true),
            None => (path, false),
        };
        if path.is_empty() {
            return Err(Error::query("$expand", "empty item"));
        }

        let mut item = if path == "*" {
            ExpandItem::star()
        } else {
            ExpandItem::new(path)
        };
        item.is_ref = is_ref;
        if let Some(nested) = nested {
            item.options = parse_nested(nested, depth, limits)?;
        }
        if expand
            .items()
            .iter()
            .any(|i| i.path == item.path && i.is_ref == item.is_ref)
        {
            return Err(Error::query("$expand", format!("`{path}` expanded more than once")));
        }
        expand.push(item);
    }
    Ok(expand)
}

fn parse_nested(text: &str, depth: u32, limits: &ODataLimits) -> Result<QueryOptions, Error> {
    let mut options = QueryOptions::default();
    let mut seen: Vec<&str> = Vec::new();
    for part in split_top_level(text, ';').ok_or_else(|| unbalanced("$expand"))? {
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| Error::query("$expand", format!("malformed nested option `{part}`")))?;
        match name {
            "$id" | "$skiptoken" | "$format" => {
                return Err(Error::query(name, "not allowed inside $expand"));
            }
            _ if !name.starts_with('$') => {
                return Err(Error::query("$expand", format!("unknown nested option `{name}`")));
            }
            _ => {}
        }
        if seen.contains(&name) {
            return Err(Error::query(name, "specified more than once"));
        }
        seen.push(name);
        apply(&mut options, name, value, depth + 1, limits)?;
    }
    Ok(options)
}

fn unbalanced(option: &str) -> Error {
    Error::query(option, "unbalanced parentheses or quotes")
}

/// Split at `separator` outside quotes and parentheses; `None` if unbalanced.
fn split_top_level(text: &str, separator: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.checked_sub(1)?,
            c if c == separator && !quoted && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if quoted || depth != 0 {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}

pub(super) fn validate(
    options: &QueryOptions,
    edm: &Edm,
    target: &EdmStructuredType,
    limits: &ODataLimits,
    depth: u32,
) -> Result<(), Error> {
    if let Some(select) = &options.select {
        limits.validate_select_items(select.len())?;
        for item in select.items() {
            validate_select_item(edm, target, item)?;
        }
    }
    let Some(expand) = &options.expand else {
        return Ok(());
    };
    limits.validate_expand_depth(depth)?;
    for item in expand.items() {
        if item.is_ref && (item.options.select.is_some() || item.options.expand.is_some()) {
            return Err(Error::query(
                "$expand",
                format!("`{}/$ref` cannot carry $select or $expand", item.path),
            ));
        }
        if item.is_star {
            continue;
        }
        let nav_target = resolve_expand_path(edm, target, &item.path)?;
        let nested = edm.resolve_type(nav_target)?;
        validate(&item.options, edm, nested, limits, depth + 1)?;
    }
    Ok(())
}

fn validate_select_item<'a>(
    edm: &'a Edm,
    target: &'a EdmStructuredType,
    item: &str,
) -> Result<(), Error> {
    if item == "*" {
        return Ok(());
    }
    let missing = || Error::not_found(ResourceKind::Property, item);
    let mut current = target;
    let mut segments = item.split('/').peekable();
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        if segment.contains('.') {
            // `Ns.*` or a bound operation, possibly behind a type cast
            if last && (segment.ends_with(".*") || is_operation_name(edm, segment)) {
                return Ok(());
            }
            current = type_cast(edm, current, segment)?;
            continue;
        }
        if let Some(property) = current.property(segment) {
            match &property.ty {
                EdmType::Complex(fqn) if !last => current = edm.resolve_type(fqn)?,
                _ if last => return Ok(()),
                _ => return Err(missing()),
            }
        } else if last && current.navigation_property(segment).is_some() {
            return Ok(());
        } else {
            return Err(missing());
        }
    }
    Err(missing())
}

fn is_operation_name(edm: &Edm, name: &str) -> bool {
    name.parse::<FullQualifiedName>().is_ok_and(|fqn| {
        let fqn = edm.canonical_name(&fqn);
        edm.operations().any(|op| op.fqn == *fqn)
    })
}

fn type_cast<'a>(
    edm: &'a Edm,
    current: &EdmStructuredType,
    segment: &str,
) -> Result<&'a EdmStructuredType, Error> {
    segment
        .parse::<FullQualifiedName>()
        .ok()
        .and_then(|fqn| edm.find_type(&fqn))
        .filter(|cast| edm.is_same_or_derived(cast.fqn(), current.fqn()))
        .ok_or_else(|| Error::not_found(ResourceKind::Type, segment))
}

/// Target type of an expand path (`Nav`, `Complex/Nav`, `Ns.Derived/Nav`).
fn resolve_expand_path<'a>(
    edm: &'a Edm,
    target: &'a EdmStructuredType,
    path: &str,
) -> Result<&'a FullQualifiedName, Error> {
    let mut current = target;
    let mut segments = path.split('/').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            return current
                .navigation_property(segment)
                .map(|nav| &nav.target)
                .ok_or_else(|| Error::not_found(ResourceKind::Navigation, segment));
        }
        if segment.contains('.') {
            current = type_cast(edm, current, segment)?;
            continue;
        }
        current = match current.property(segment).map(|p| &p.ty) {
            Some(EdmType::Complex(fqn)) => edm.resolve_type(fqn)?,
            _ => return Err(Error::not_found(ResourceKind::Property, segment)),
        };
    }
    Err(Error::not_found(ResourceKind::Navigation, path))
}
