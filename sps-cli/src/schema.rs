//! Tag expressions parsed at runtime, and their JSON mapping.
//!
//! The grammar mirrors the static tags: `bool`, `char`, `i8`..`u64`,
//! `empty` (alias `void`), `addr`, `string`, `error`, `seq<T>`,
//! `tuple<T, ..>`, `map<K, V>` and `expected<T>`. A signature is
//! `RET(ARG, ..)`.
//!
//! JSON shapes: `error` is `null` or `{"error": msg}`; `expected<T>` is
//! `{"value": v}` or `{"error": msg}`; `map<K, V>` is an array of `[k, v]`
//! pairs (an object is accepted on input); `addr` is a number or a `0x`
//! string; `char` is a byte value or a one-byte string.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail, ensure};
use serde_json::{Value, json};
use sps::{
    InputBuffer, SerializableError, SpsChar, SpsDeserialize, SpsError, SpsSerialize, SpsString,
    SpsTargetAddress, TargetAddr,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Schema {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Empty,
    Addr,
    String,
    Error,
    Seq(Box<Schema>),
    Tuple(Vec<Schema>),
    Map(Box<Schema>, Box<Schema>),
    Expected(Box<Schema>),
}

/// A wrapper-function signature: return tag and argument tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    pub(crate) ret: Schema,
    pub(crate) args: Vec<Schema>,
}

impl Signature {
    /// Encodes one JSON value per argument, concatenated.
    pub(crate) fn encode_args(&self, values: &[Value]) -> Result<Vec<u8>> {
        ensure!(
            values.len() == self.args.len(),
            "signature takes {} argument(s), got {}",
            self.args.len(),
            values.len()
        );
        let mut out = Vec::new();
        for (i, (schema, value)) in self.args.iter().zip(values).enumerate() {
            schema
                .encode(value, &mut out)
                .with_context(|| format!("argument {i} ({schema})"))?;
        }
        Ok(out)
    }
}

impl Schema {
    /// Encodes `value` and returns the bytes.
    pub(crate) fn to_bytes(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(value, &mut out)?;
        Ok(out)
    }

    /// Decodes exactly one value from `bytes`; trailing bytes are an error.
    pub(crate) fn from_bytes(&self, bytes: &[u8]) -> Result<Value> {
        let mut ib = InputBuffer::new(bytes);
        let value = self.decode(&mut ib)?;
        ensure!(ib.remaining() == 0, "{} trailing byte(s)", ib.remaining());
        Ok(value)
    }

    fn encode(&self, v: &Value, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Bool => put::<bool, _>(out, &v.as_bool().with_context(|| self.mismatch(v))?),
            Self::Char => put::<SpsChar, _>(out, &char_byte(v).with_context(|| self.mismatch(v))?),
            Self::I8 => put::<i8, _>(out, &int::<i8>(v).with_context(|| self.mismatch(v))?),
            Self::I16 => put::<i16, _>(out, &int::<i16>(v).with_context(|| self.mismatch(v))?),
            Self::I32 => put::<i32, _>(out, &int::<i32>(v).with_context(|| self.mismatch(v))?),
            Self::I64 => put::<i64, _>(out, &int::<i64>(v).with_context(|| self.mismatch(v))?),
            Self::U8 => put::<u8, _>(out, &int::<u8>(v).with_context(|| self.mismatch(v))?),
            Self::U16 => put::<u16, _>(out, &int::<u16>(v).with_context(|| self.mismatch(v))?),
            Self::U32 => put::<u32, _>(out, &int::<u32>(v).with_context(|| self.mismatch(v))?),
            Self::U64 => put::<u64, _>(out, &int::<u64>(v).with_context(|| self.mismatch(v))?),
            Self::Empty => {
                ensure!(v.is_null(), "{}", self.mismatch(v));
                Ok(())
            }
            Self::Addr => put::<SpsTargetAddress, _>(out, &addr(v).with_context(|| self.mismatch(v))?),
            Self::String => put::<SpsString, _>(out, v.as_str().with_context(|| self.mismatch(v))?),
            Self::Error => {
                let carrier = if v.is_null() {
                    SerializableError::Success
                } else {
                    SerializableError::Failure(error_message(v).with_context(|| self.mismatch(v))?)
                };
                put::<SpsError, _>(out, &carrier)
            }
            Self::Seq(elem) => {
                let items = v.as_array().with_context(|| self.mismatch(v))?;
                put::<u64, _>(out, &(items.len() as u64))?;
                items.iter().try_for_each(|item| elem.encode(item, out))
            }
            Self::Tuple(elems) => {
                let items = v.as_array().with_context(|| self.mismatch(v))?;
                ensure!(
                    items.len() == elems.len(),
                    "{self} needs {} element(s), got {}",
                    elems.len(),
                    items.len()
                );
                elems
                    .iter()
                    .zip(items)
                    .try_for_each(|(elem, item)| elem.encode(item, out))
            }
            Self::Map(key, val) => {
                let entries = map_entries(v).with_context(|| self.mismatch(v))?;
                put::<u64, _>(out, &(entries.len() as u64))?;
                for (k, x) in entries {
                    key.encode(&k, out)?;
                    val.encode(x, out)?;
                }
                Ok(())
            }
            Self::Expected(inner) => {
                if let Some(value) = v.get("value") {
                    put::<bool, _>(out, &true)?;
                    inner.encode(value, out)
                } else {
                    let msg = error_message(v).with_context(|| self.mismatch(v))?;
                    put::<bool, _>(out, &false)?;
                    put::<SpsString, _>(out, &msg)
                }
            }
        }
    }

    fn decode(&self, ib: &mut InputBuffer<'_>) -> Result<Value> {
        Ok(match self {
            Self::Bool => Value::Bool(get::<bool, bool>(ib)?),
            Self::Char => json!(get::<SpsChar, u8>(ib)?),
            Self::I8 => json!(get::<i8, i8>(ib)?),
            Self::I16 => json!(get::<i16, i16>(ib)?),
            Self::I32 => json!(get::<i32, i32>(ib)?),
            Self::I64 => json!(get::<i64, i64>(ib)?),
            Self::U8 => json!(get::<u8, u8>(ib)?),
            Self::U16 => json!(get::<u16, u16>(ib)?),
            Self::U32 => json!(get::<u32, u32>(ib)?),
            Self::U64 => json!(get::<u64, u64>(ib)?),
            Self::Empty => Value::Null,
            Self::Addr => Value::String(get::<SpsTargetAddress, TargetAddr>(ib)?.to_string()),
            Self::String => Value::String(get::<SpsString, String>(ib)?),
            Self::Error => match get::<SpsError, SerializableError>(ib)? {
                SerializableError::Success => Value::Null,
                SerializableError::Failure(msg) => json!({ "error": msg }),
            },
            Self::Seq(elem) => {
                let n = self.read_count(ib, elem.min_size())?;
                let items = (0..n).map(|_| elem.decode(ib)).collect::<Result<Vec<_>>>()?;
                Value::Array(items)
            }
            Self::Tuple(elems) => Value::Array(
                elems
                    .iter()
                    .map(|elem| elem.decode(ib))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Map(key, val) => {
                let n = self.read_count(ib, key.min_size() + val.min_size())?;
                let entries = (0..n)
                    .map(|_| -> Result<Value> { Ok(json!([key.decode(ib)?, val.decode(ib)?])) })
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(entries)
            }
            Self::Expected(inner) => {
                if get::<bool, bool>(ib)? {
                    json!({ "value": inner.decode(ib)? })
                } else {
                    json!({ "error": get::<SpsString, String>(ib)? })
                }
            }
        })
    }

    fn read_count(&self, ib: &mut InputBuffer<'_>, elem_size: usize) -> Result<u64> {
        let n = get::<u64, u64>(ib)?;
        let fits = match elem_size as u64 {
            0 => n <= sps::MAX_EMPTY_ELEMENTS as u64,
            size => n <= ib.remaining() as u64 / size,
        };
        ensure!(fits, "{self}: count {n} exceeds the remaining input");
        Ok(n)
    }

    /// Fewest bytes any value of this shape encodes to.
    fn min_size(&self) -> usize {
        match self {
            Self::Bool | Self::Char | Self::I8 | Self::U8 | Self::Error | Self::Expected(_) => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 | Self::U64 | Self::Addr | Self::String | Self::Seq(_) | Self::Map(..) => 8,
            Self::Empty => 0,
            Self::Tuple(elems) => elems.iter().map(Self::min_size).sum(),
        }
    }

    fn mismatch(&self, v: &Value) -> String {
        format!("expected {self}, got {v}")
    }
}

fn put<Tag, T: SpsSerialize<Tag> + ?Sized>(out: &mut Vec<u8>, value: &T) -> Result<()> {
    out.extend(sps::to_vec::<Tag, T>(value)?);
    Ok(())
}

fn get<'de, Tag, T: SpsDeserialize<'de, Tag>>(ib: &mut InputBuffer<'de>) -> Result<T> {
    Ok(<T as SpsDeserialize<'de, Tag>>::deserialize(ib)?)
}

fn int<T: TryFrom<u64> + TryFrom<i64>>(v: &Value) -> Option<T> {
    match (v.as_u64(), v.as_i64()) {
        (Some(u), _) => <T as TryFrom<u64>>::try_from(u).ok(),
        (None, Some(i)) => <T as TryFrom<i64>>::try_from(i).ok(),
        (None, None) => None,
    }
}

fn char_byte(v: &Value) -> Option<u8> {
    match v {
        Value::String(s) if s.len() == 1 => Some(s.as_bytes()[0]),
        _ => int::<u8>(v),
    }
}

fn addr(v: &Value) -> Option<TargetAddr> {
    match v {
        Value::String(s) => {
            let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
            u64::from_str_radix(digits, 16).ok().map(TargetAddr)
        }
        _ => v.as_u64().map(TargetAddr),
    }
}

fn error_message(v: &Value) -> Option<String> {
    v.get("error")?.as_str().map(str::to_owned)
}

fn map_entries(v: &Value) -> Option<Vec<(Value, &Value)>> {
    match v {
        Value::Object(obj) => Some(
            obj.iter()
                .map(|(k, x)| (Value::String(k.clone()), x))
                .collect(),
        ),
        Value::Array(pairs) => pairs.iter().map(map_pair).collect(),
        _ => None,
    }
}

fn map_pair(pair: &Value) -> Option<(Value, &Value)> {
    match pair.as_array()?.as_slice() {
        [k, x] => Some((k.clone(), x)),
        _ => None,
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Char => f.write_str("char"),
            Self::I8 => f.write_str("i8"),
            Self::I16 => f.write_str("i16"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::U8 => f.write_str("u8"),
            Self::U16 => f.write_str("u16"),
            Self::U32 => f.write_str("u32"),
            Self::U64 => f.write_str("u64"),
            Self::Empty => f.write_str("empty"),
            Self::Addr => f.write_str("addr"),
            Self::String => f.write_str("string"),
            Self::Error => f.write_str("error"),
            Self::Seq(elem) => write!(f, "seq<{elem}>"),
            Self::Tuple(elems) => {
                f.write_str("tuple<")?;
                write_list(f, elems)?;
                f.write_str(">")
            }
            Self::Map(k, v) => write!(f, "map<{k}, {v}>"),
            Self::Expected(inner) => write!(f, "expected<{inner}>"),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ret)?;
        write_list(f, &self.args)?;
        f.write_str(")")
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Schema]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl FromStr for Schema {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut p = Parser::new(s);
        let schema = p.schema()?;
        p.finish()?;
        Ok(schema)
    }
}

impl FromStr for Signature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut p = Parser::new(s);
        let ret = p.schema()?;
        let args = p.list('(', ')')?;
        p.finish()?;
        Ok(Self { ret, args })
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_ws(&mut self) {
        let rest = self.src[self.pos..].trim_start();
        self.pos = self.src.len() - rest.len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            bail!("expected `{c}` at offset {} in `{}`", self.pos, self.src)
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.skip_ws();
        ensure!(
            self.pos == self.src.len(),
            "unexpected `{}` at offset {}",
            &self.src[self.pos..],
            self.pos
        );
        Ok(())
    }

    fn ident(&mut self) -> &'a str {
        self.skip_ws();
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn list(&mut self, open: char, close: char) -> Result<Vec<Schema>> {
        self.expect(open)?;
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.schema()?);
            if !self.eat(',') {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn params<const N: usize>(&mut self, name: &str) -> Result<[Schema; N]> {
        let items = self.list('<', '>')?;
        let got = items.len();
        items
            .try_into()
            .map_err(|_| anyhow::anyhow!("`{name}` takes {N} parameter(s), got {got}"))
    }

    fn schema(&mut self) -> Result<Schema> {
        let start = self.pos;
        Ok(match self.ident() {
            "bool" => Schema::Bool,
            "char" => Schema::Char,
            "i8" => Schema::I8,
            "i16" => Schema::I16,
            "i32" => Schema::I32,
            "i64" => Schema::I64,
            "u8" => Schema::U8,
            "u16" => Schema::U16,
            "u32" => Schema::U32,
            "u64" => Schema::U64,
            "empty" | "void" => Schema::Empty,
            "addr" => Schema::Addr,
            "string" => Schema::String,
            "error" => Schema::Error,
            "seq" => {
                let [elem] = self.params::<1>("seq")?;
                Schema::Seq(Box::new(elem))
            }
            "expected" => {
                let [inner] = self.params::<1>("expected")?;
                Schema::Expected(Box::new(inner))
            }
            "map" => {
                let [k, v] = self.params::<2>("map")?;
                Schema::Map(Box::new(k), Box::new(v))
            }
            "tuple" => Schema::Tuple(self.list('<', '>')?),
            "" => bail!("expected a tag at offset {start} in `{}`", self.src),
            other => bail!("unknown tag `{other}`"),
        })
    }
}

#[cfg(test)]
mod tests {
    use sps::{SpsArgList, SpsExpected, SpsMap, SpsSequence, SpsTuple, to_vec};

    use super::*;

    fn schema(s: &str) -> Schema {
        s.parse().unwrap()
    }

    #[test]
    fn parses_nested_tags() {
        assert_eq!(
            schema(" map< string , seq<tuple<u8, addr>> >"),
            Schema::Map(
                Box::new(Schema::String),
                Box::new(Schema::Seq(Box::new(Schema::Tuple(vec![Schema::U8, Schema::Addr])))),
            )
        );
        assert_eq!(schema("tuple<>"), Schema::Tuple(vec![]));
        assert_eq!(schema("void"), Schema::Empty);
    }

    #[test]
    fn display_is_reparseable() {
        for s in ["expected<map<string, seq<i64>>>", "tuple<bool, char, error>", "addr"] {
            let parsed = schema(s);
            assert_eq!(schema(&parsed.to_string()), parsed);
        }
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!("seq<u32".parse::<Schema>().is_err());
        assert!("seq<u32, u8>".parse::<Schema>().is_err());
        assert!("float".parse::<Schema>().is_err());
        assert!("u32 u32".parse::<Schema>().is_err());
        assert!("".parse::<Schema>().is_err());
    }

    #[test]
    fn parses_signatures() {
        let sig: Signature = "expected<u64>(u64, u64)".parse().unwrap();
        assert_eq!(sig.ret, Schema::Expected(Box::new(Schema::U64)));
        assert_eq!(sig.args, vec![Schema::U64, Schema::U64]);
        assert_eq!(sig.to_string(), "expected<u64>(u64, u64)");

        let void: Signature = "void()".parse().unwrap();
        assert!(void.args.is_empty());
        assert!("u32".parse::<Signature>().is_err());
    }

    #[test]
    fn encoding_matches_static_codec() {
        let bytes = schema("tuple<u32, string>").to_bytes(&json!([7, "hi"])).unwrap();
        assert_eq!(
            bytes,
            to_vec::<SpsTuple<(u32, SpsString)>, _>(&(7u32, "hi")).unwrap()
        );

        let seq = schema("seq<i16>").to_bytes(&json!([-1, 2])).unwrap();
        assert_eq!(seq, to_vec::<SpsSequence<i16>, _>(&vec![-1i16, 2]).unwrap());

        let map = schema("map<string, u8>").to_bytes(&json!({"a": 1})).unwrap();
        assert_eq!(
            map,
            to_vec::<SpsMap<SpsString, u8>, _>(&vec![("a".to_owned(), 1u8)]).unwrap()
        );
    }

    #[test]
    fn sum_types_use_json_objects() {
        let err = schema("error").to_bytes(&json!({"error": "nope"})).unwrap();
        assert_eq!(err, to_vec::<SpsError, _>(&Err::<(), _>("nope")).unwrap());
        assert_eq!(schema("error").to_bytes(&Value::Null).unwrap(), [0]);

        let ok = schema("expected<u32>").to_bytes(&json!({"value": 5})).unwrap();
        assert_eq!(ok, [1, 5, 0, 0, 0]);
        assert_eq!(
            schema("expected<u32>").from_bytes(&ok).unwrap(),
            json!({"value": 5})
        );

        let bad: std::result::Result<u32, &str> = Err("nope");
        let bytes = to_vec::<SpsExpected<u32>, _>(&bad).unwrap();
        assert_eq!(
            schema("expected<u32>").from_bytes(&bytes).unwrap(),
            json!({"error": "nope"})
        );
    }

    #[test]
    fn decodes_back_to_json() {
        let s = schema("tuple<bool, char, addr, map<u8, string>, empty>");
        let value = json!([true, 65, "0x0000000000001000", [[1, "x"]], null]);
        let bytes = s.to_bytes(&value).unwrap();
        assert_eq!(s.from_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn char_accepts_one_byte_strings() {
        assert_eq!(schema("char").to_bytes(&json!("A")).unwrap(), [b'A']);
        assert!(schema("char").to_bytes(&json!("AB")).is_err());
    }

    #[test]
    fn range_and_shape_errors() {
        assert!(schema("u8").to_bytes(&json!(256)).is_err());
        assert!(schema("i8").to_bytes(&json!(-129)).is_err());
        assert_eq!(schema("i8").to_bytes(&json!(-1)).unwrap(), [0xff]);
        assert!(schema("tuple<u8, u8>").to_bytes(&json!([1])).is_err());
        assert!(schema("string").to_bytes(&json!(1)).is_err());
    }

    #[test]
    fn decode_rejects_trailing_and_short_input() {
        assert!(schema("u16").from_bytes(&[1, 0, 0]).is_err());
        assert!(schema("u32").from_bytes(&[1, 0]).is_err());
        assert!(schema("seq<u64>").from_bytes(&u64::MAX.to_le_bytes()).is_err());
        assert!(schema("seq<empty>").from_bytes(&u64::MAX.to_le_bytes()).is_err());
    }

    #[test]
    fn signature_arguments_are_an_arg_list() {
        let sig: Signature = "u64(u32, string)".parse().unwrap();
        let bytes = sig.encode_args(&[json!(3), json!("z")]).unwrap();
        let expected = SpsArgList::<(u32, SpsString)>::to_wrapper_function_result(&(3u32, "z"))
            .unwrap();
        assert_eq!(bytes, expected.data());
        assert!(sig.encode_args(&[json!(3)]).is_err());
    }
}
