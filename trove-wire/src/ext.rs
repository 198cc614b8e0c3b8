//! Supplemental `nom` parsers for response grammar `imap-codec` doesn't cover:
//! `THREAD`, `SORT`, `ESEARCH` (RFC 4731/5267), `NAMESPACE` (RFC 2342) and `ID`
//! (RFC 2971).
//!
//! Styled after `examples/yageek-tokio-imap/imap-proto/src/parser/rfc3501/mod.rs`:
//! small combinator functions named after the grammar rule they implement, composed
//! bottom-up, each returning `IResult<&[u8], T>`.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{map, map_res, opt, value},
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::types::{NamespaceResponse, Namespace, Response, ThreadingNode};

fn number(input: &[u8]) -> IResult<&[u8], u32> {
    map_res(digit1, |d: &[u8]| {
        std::str::from_utf8(d).unwrap().parse::<u32>()
    })(input)
}

/// `thread-list = "(" (nz-number *(SP nz-number) / thread-list) *(SP thread-list) ")"`
/// (RFC 5256 §3). A bare number list is sugar for a straight parent-child chain.
fn thread_node(input: &[u8]) -> IResult<&[u8], ThreadingNode> {
    delimited(
        char('('),
        alt((thread_chain, thread_children)),
        char(')'),
    )(input)
}

fn thread_chain(input: &[u8]) -> IResult<&[u8], ThreadingNode> {
    let (input, nums) = separated_list0(space1, number)(input)?;
    let mut iter = nums.into_iter().rev();
    let mut node = ThreadingNode {
        num: iter.next().unwrap_or(0),
        children: Vec::new(),
    };
    for num in iter {
        node = ThreadingNode {
            num,
            children: vec![node],
        };
    }
    Ok((input, node))
}

fn thread_children(input: &[u8]) -> IResult<&[u8], ThreadingNode> {
    let (input, children) = separated_list0(space1, thread_node)(input)?;
    Ok((
        input,
        ThreadingNode {
            num: 0,
            children,
        },
    ))
}

pub fn thread_response(input: &[u8]) -> IResult<&[u8], Response> {
    let (input, _) = tuple((tag_no_case("* THREAD"), space0))(input)?;
    let (input, nodes) = many0(preceded(space0, thread_node))(input)?;
    Ok((input, Response::Thread(nodes)))
}

/// `* SORT 2 3 4` (RFC 5256 §5) — a plain list of UIDs/sequence numbers, already in
/// sorted order.
pub fn sort_response(input: &[u8]) -> IResult<&[u8], Response> {
    let (input, _) = tuple((tag_no_case("* SORT"), space0))(input)?;
    let (input, uids) = separated_list0(space1, number)(input)?;
    Ok((input, Response::Sort(uids)))
}

/// `* ESEARCH (TAG "a") UID ALL 1,3,5:9` (RFC 4731) — we only need `UID`/`COUNT`
/// for `spec.md` §4.4's usage (UID-based extended search).
pub fn esearch_response(input: &[u8]) -> IResult<&[u8], Response> {
    let (input, _) = tuple((tag_no_case("* ESEARCH"), space0))(input)?;
    let (input, tag_opt) = opt(delimited(
        tuple((tag_no_case("(TAG"), space1)),
        delimited(char('"'), take_while1(|c: u8| c != b'"'), char('"')),
        char(')'),
    ))(input)?;
    let (input, _) = opt(preceded(space1, tag_no_case("UID")))(input)?;
    let (input, count) = opt(preceded(
        tuple((space1, tag_no_case("COUNT"), space1)),
        number,
    ))(input)?;
    let (input, uids) = opt(preceded(
        tuple((space1, tag_no_case("ALL"), space1)),
        sequence_set,
    ))(input)?;
    Ok((
        input,
        Response::Esearch {
            tag: tag_opt.map(|b| String::from_utf8_lossy(b).into_owned()),
            uids: uids.unwrap_or_default(),
            count,
        },
    ))
}

/// A simplified `sequence-set`: expands `N:M` ranges and bare numbers. `*` (meaning
/// "highest UID in the mailbox") cannot be resolved here and is dropped — callers that
/// need it should read the corresponding `UIDNEXT`/`EXISTS` state instead.
fn sequence_set(input: &[u8]) -> IResult<&[u8], Vec<u32>> {
    separated_list0(char(','), seq_range)(input).map(|(rest, ranges)| {
        (rest, ranges.into_iter().flatten().collect())
    })
}

fn seq_range(input: &[u8]) -> IResult<&[u8], Vec<u32>> {
    alt((
        map(tuple((number, char(':'), number)), |(a, _, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            (lo..=hi).collect()
        }),
        map(number, |n| vec![n]),
        value(Vec::new(), char('*')),
    ))(input)
}

/// `* NAMESPACE (("" "/")) NIL NIL` (RFC 2342 §5). Each of the three top-level groups
/// is either `NIL` or a parenthesized list of `(prefix delimiter)` pairs.
pub fn namespace_response(input: &[u8]) -> IResult<&[u8], Response> {
    let (input, _) = tuple((tag_no_case("* NAMESPACE"), space1))(input)?;
    let (input, personal) = namespace_group(input)?;
    let (input, _) = space1(input)?;
    let (input, other_users) = namespace_group(input)?;
    let (input, _) = space1(input)?;
    let (input, shared) = namespace_group(input)?;
    Ok((
        input,
        Response::Namespace(NamespaceResponse {
            personal,
            other_users,
            shared,
        }),
    ))
}

fn namespace_group(input: &[u8]) -> IResult<&[u8], Vec<Namespace>> {
    alt((
        value(Vec::new(), tag_no_case("NIL")),
        delimited(char('('), many0(namespace_pair), char(')')),
    ))(input)
}

fn namespace_pair(input: &[u8]) -> IResult<&[u8], Namespace> {
    delimited(
        char('('),
        map(
            tuple((
                delimited(char('"'), take_while1(|c: u8| c != b'"'), char('"')),
                space1,
                alt((
                    map(
                        delimited(char('"'), take_while1(|c: u8| c != b'"'), char('"')),
                        |b: &[u8]| Some(b[0] as char),
                    ),
                    value(None, tag_no_case("NIL")),
                )),
            )),
            |(prefix, _, delimiter)| Namespace {
                prefix: String::from_utf8_lossy(prefix).into_owned(),
                delimiter,
            },
        ),
        char(')'),
    )(input)
}

/// `* ID ("name" "value" ...)` or `* ID NIL` (RFC 2971 §3.2).
pub fn id_response(input: &[u8]) -> IResult<&[u8], Response> {
    let (input, _) = tuple((tag_no_case("* ID"), space1))(input)?;
    let (input, pairs) = alt((
        value(Vec::new(), tag_no_case("NIL")),
        delimited(char('('), many0(id_pair), char(')')),
    ))(input)?;
    Ok((input, Response::Id(pairs.into_iter().collect())))
}

fn id_pair(input: &[u8]) -> IResult<&[u8], (String, Option<String>)> {
    let quoted = delimited(char('"'), take_while1(|c: u8| c != b'"'), char('"'));
    map(
        tuple((
            opt(space0),
            quoted,
            space1,
            alt((
                map(quoted, |b: &[u8]| Some(String::from_utf8_lossy(b).into_owned())),
                value(None, tag_no_case("NIL")),
            )),
            opt(space0),
        )),
        |(_, k, _, v, _)| (String::from_utf8_lossy(k).into_owned(), v),
    )(input)
}

/// Entry point used by [`crate::response::convert`] when `imap-codec` can't make
/// sense of a data line on its own (it never will for THREAD/SORT/ESEARCH/NAMESPACE/ID
/// since those extensions aren't in its grammar at all).
pub fn parse_line(line: &[u8]) -> Result<Response, String> {
    alt((
        thread_response,
        sort_response,
        esearch_response,
        namespace_response,
        id_response,
    ))(line)
    .map(|(_, response)| response)
    .map_err(|e| format!("unrecognized extension response: {e:?}"))
}

/// Placeholder used by [`crate::response::convert_data`] for `imap_types::response::Data`
/// variants it doesn't translate directly (currently none reach this path; kept so the
/// match there stays total without a silent wildcard).
pub fn parse_extension_data(debug_repr: &str) -> Result<Response, String> {
    Err(format!("unhandled data variant: {debug_repr}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_parses_nested_chain() {
        let (_, resp) = thread_response(b"* THREAD (1)(2 3)((4)(5 6))").unwrap();
        match resp {
            Response::Thread(nodes) => assert_eq!(nodes.len(), 3),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn sort_parses_uid_list() {
        let (_, resp) = sort_response(b"* SORT 2 3 4").unwrap();
        assert_eq!(resp, Response::Sort(vec![2, 3, 4]));
    }

    #[test]
    fn esearch_parses_tag_and_uid_all() {
        let (_, resp) =
            esearch_response(b"* ESEARCH (TAG \"a\") UID COUNT 3 ALL 1,3,5:7").unwrap();
        match resp {
            Response::Esearch { tag, uids, count } => {
                assert_eq!(tag.as_deref(), Some("a"));
                assert_eq!(count, Some(3));
                assert_eq!(uids, vec![1, 3, 5, 6, 7]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn namespace_parses_personal_only() {
        let (_, resp) = namespace_response(b"* NAMESPACE ((\"\" \"/\")) NIL NIL").unwrap();
        match resp {
            Response::Namespace(ns) => {
                assert_eq!(ns.personal.len(), 1);
                assert!(ns.other_users.is_empty());
                assert!(ns.shared.is_empty());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn id_parses_key_value_pairs() {
        let (_, resp) = id_response(b"* ID (\"name\" \"trove\" \"version\" \"0.1\")").unwrap();
        match resp {
            Response::Id(map) => {
                assert_eq!(map.get("name").unwrap().as_deref(), Some("trove"));
            }
            _ => panic!("wrong variant"),
        }
    }
}
