//! Built-in function catalog.
//!
//! Each [`FunctionDef`] carries everything the parser needs to validate a
//! call (arity, argument types, return type and result width) and the
//! handler the evaluator dispatches to. Adding a function is a matter of
//! adding an entry to [`FUNCTIONS`]; neither the parser nor the evaluator
//! names individual functions.

use crate::config::ExpressionConfig;
use crate::date;
use crate::expression::node::Node;
use crate::expression::{
    ExpressionError, ExpressionResult, ReturnType, Value, MAX_CHARACTER_LEN,
};
use crate::table::Table;
use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

/// Accepted type for one argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Character,
    Numeric,
    Date,
    Logical,
    Any,
}

impl ArgType {
    pub fn accepts(&self, actual: ReturnType) -> bool {
        matches!(
            (self, actual),
            (ArgType::Any, _)
                | (ArgType::Character, ReturnType::Character)
                | (ArgType::Numeric, ReturnType::Numeric)
                | (ArgType::Date, ReturnType::Date)
                | (ArgType::Logical, ReturnType::Logical)
        )
    }
}

/// How a call's return type is decided
#[derive(Debug, Clone, Copy)]
pub enum ReturnRule {
    Fixed(ReturnType),
    /// Same type as the argument at this position
    SameAsArg(usize),
}

/// How a call's result length is decided
#[derive(Debug, Clone, Copy)]
pub enum LengthRule {
    Fixed(usize),
    /// Result length of the argument at this position
    ArgLength(usize),
    /// Value of the numeric constant at this position
    ArgValue(usize),
    /// Value of the numeric constant at this position when supplied, else the default
    ArgValueOr(usize, usize),
    /// Length of the first argument times the constant second argument
    Replicate,
    /// Larger of two argument lengths
    LongerOf(usize, usize),
    /// Width of the configured date picture
    DateFormat,
}

/// Everything a handler may consult besides its arguments
pub struct FunctionContext<'a> {
    pub table: Option<&'a dyn Table>,
    pub config: &'a ExpressionConfig,
}

/// Evaluated arguments of one call
pub struct Args<'v> {
    function: &'static str,
    values: &'v [Value],
}

impl<'v> Args<'v> {
    pub fn new(function: &'static str, values: &'v [Value]) -> Self {
        Self { function, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> ExpressionResult<&'v Value> {
        self.values.get(index).ok_or_else(|| self.missing(index))
    }

    pub fn character(&self, index: usize) -> ExpressionResult<&'v str> {
        self.value(index)?.as_str().ok_or_else(|| self.missing(index))
    }

    pub fn numeric(&self, index: usize) -> ExpressionResult<f64> {
        self.value(index)?.as_f64().ok_or_else(|| self.missing(index))
    }

    pub fn date(&self, index: usize) -> ExpressionResult<Option<NaiveDate>> {
        self.value(index)?.as_date().ok_or_else(|| self.missing(index))
    }

    pub fn logical(&self, index: usize) -> ExpressionResult<bool> {
        self.value(index)?.as_bool().ok_or_else(|| self.missing(index))
    }

    /// Numeric argument read as a count; negatives become zero.
    ///
    /// Counts beyond [`MAX_CHARACTER_LEN`] are rejected.
    pub fn count(&self, index: usize) -> ExpressionResult<usize> {
        let n = self.numeric(index)?.max(0.0);
        if n > MAX_CHARACTER_LEN as f64 {
            return Err(self.invalid(&format!(
                "argument {} is larger than {}",
                index + 1,
                MAX_CHARACTER_LEN
            )));
        }
        Ok(n as usize)
    }

    fn missing(&self, index: usize) -> ExpressionError {
        ExpressionError::InvalidParm {
            function: self.function.to_string(),
            reason: format!("argument {} missing or of the wrong type", index + 1),
        }
    }

    fn invalid(&self, reason: &str) -> ExpressionError {
        ExpressionError::InvalidParm {
            function: self.function.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Handler = fn(&FunctionContext<'_>, &Args<'_>) -> ExpressionResult<Value>;

/// Extra parse-time validation over the argument nodes
pub type ArgCheck = fn(&FunctionDef, &[Node]) -> ExpressionResult<()>;

/// Catalog entry for one built-in function
pub struct FunctionDef {
    pub name: &'static str,
    /// Accepted type per position; its length is the maximum arity
    pub args: &'static [ArgType],
    pub min_args: usize,
    pub returns: ReturnRule,
    pub length: LengthRule,
    /// Needs a bound table to evaluate
    pub needs_table: bool,
    pub check: Option<ArgCheck>,
    pub handler: Handler,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("min_args", &self.min_args)
            .field("returns", &self.returns)
            .field("length", &self.length)
            .finish()
    }
}

impl FunctionDef {
    pub fn max_args(&self) -> usize {
        self.args.len()
    }

    pub fn return_type(&self, args: &[Node]) -> ReturnType {
        match self.returns {
            ReturnRule::Fixed(t) => t,
            ReturnRule::SameAsArg(i) => args
                .get(i)
                .map(|n| n.return_type)
                .unwrap_or(ReturnType::Character),
        }
    }

    /// Result length for a call with these arguments.
    ///
    /// Fails with `InvalidParm` when the length would pass
    /// [`MAX_CHARACTER_LEN`].
    pub fn result_len(
        &self,
        args: &[Node],
        config: &ExpressionConfig,
    ) -> ExpressionResult<usize> {
        let too_long = || ExpressionError::InvalidParm {
            function: self.name.to_string(),
            reason: format!("result longer than {} characters", MAX_CHARACTER_LEN),
        };
        let arg_len = |i: usize| args.get(i).map(|n| n.result_len).unwrap_or(0);
        let constant = |i: usize| -> ExpressionResult<Option<usize>> {
            match args.get(i).and_then(Node::constant_value).and_then(Value::as_f64) {
                Some(n) if n > MAX_CHARACTER_LEN as f64 => Err(too_long()),
                Some(n) => Ok(Some(n.max(0.0) as usize)),
                None => Ok(None),
            }
        };
        let fallback = || match args.first() {
            Some(n) if n.return_type == ReturnType::Character => n.result_len,
            _ => 0,
        };

        let len = match self.length {
            LengthRule::Fixed(n) => n,
            LengthRule::ArgLength(i) => arg_len(i),
            LengthRule::ArgValue(i) => constant(i)?.unwrap_or_else(fallback),
            LengthRule::ArgValueOr(i, default) => {
                if args.len() > i {
                    constant(i)?.unwrap_or(default)
                } else {
                    default
                }
            }
            LengthRule::Replicate => match constant(1)? {
                Some(n) => arg_len(0).checked_mul(n).ok_or_else(too_long)?,
                None => arg_len(0),
            },
            LengthRule::LongerOf(a, b) => arg_len(a).max(arg_len(b)),
            LengthRule::DateFormat => config.date_format_width(),
        };
        if len > MAX_CHARACTER_LEN {
            return Err(too_long());
        }
        Ok(len)
    }

    pub fn call(&self, ctx: &FunctionContext<'_>, values: &[Value]) -> ExpressionResult<Value> {
        (self.handler)(ctx, &Args::new(self.name, values))
    }
}

/// Find a function by name, ignoring case.
pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    let upper = name.to_ascii_uppercase();
    FUNCTIONS
        .binary_search_by(|f| f.name.cmp(upper.as_str()))
        .ok()
        .map(|i| &FUNCTIONS[i])
}

/// All built-in functions, sorted by name.
pub fn catalog() -> &'static [FunctionDef] {
    FUNCTIONS
}

use ArgType as A;
use ReturnType as R;

const fn def(
    name: &'static str,
    args: &'static [ArgType],
    min_args: usize,
    returns: ReturnType,
    length: LengthRule,
    handler: Handler,
) -> FunctionDef {
    FunctionDef {
        name,
        args,
        min_args,
        returns: ReturnRule::Fixed(returns),
        length,
        needs_table: false,
        check: None,
        handler,
    }
}

const fn table_def(
    name: &'static str,
    returns: ReturnType,
    length: LengthRule,
    handler: Handler,
) -> FunctionDef {
    FunctionDef {
        name,
        args: &[],
        min_args: 0,
        returns: ReturnRule::Fixed(returns),
        length,
        needs_table: true,
        check: None,
        handler,
    }
}

pub static FUNCTIONS: &[FunctionDef] = &[
    def("ABS", &[A::Numeric], 1, R::Numeric, LengthRule::Fixed(4), abs),
    def("ALLTRIM", &[A::Character], 1, R::Character, LengthRule::ArgLength(0), alltrim),
    def("ASC", &[A::Character], 1, R::Numeric, LengthRule::Fixed(4), asc),
    def("AT", &[A::Character, A::Character], 2, R::Numeric, LengthRule::Fixed(4), at),
    def("CDOW", &[A::Date], 1, R::Character, LengthRule::Fixed(9), cdow),
    def("CHR", &[A::Numeric], 1, R::Character, LengthRule::Fixed(1), chr),
    def("CMONTH", &[A::Date], 1, R::Character, LengthRule::Fixed(9), cmonth),
    def("CTOD", &[A::Character], 1, R::Date, LengthRule::Fixed(8), ctod),
    def("DATE", &[], 0, R::Date, LengthRule::Fixed(8), today),
    def("DAY", &[A::Date], 1, R::Numeric, LengthRule::Fixed(4), day),
    table_def("DEL", R::Character, LengthRule::Fixed(1), del),
    table_def("DELETED", R::Logical, LengthRule::Fixed(1), deleted),
    FunctionDef {
        name: "DESCEND",
        args: &[A::Any],
        min_args: 1,
        returns: ReturnRule::SameAsArg(0),
        length: LengthRule::ArgLength(0),
        needs_table: false,
        check: None,
        handler: descend,
    },
    def("DOW", &[A::Date], 1, R::Numeric, LengthRule::Fixed(4), dow),
    def("DTOC", &[A::Date], 1, R::Character, LengthRule::DateFormat, dtoc),
    def("DTOS", &[A::Date], 1, R::Character, LengthRule::Fixed(8), dtos),
    def("EXP", &[A::Numeric], 1, R::Numeric, LengthRule::Fixed(4), exp),
    FunctionDef {
        name: "IIF",
        args: &[A::Logical, A::Any, A::Any],
        min_args: 3,
        returns: ReturnRule::SameAsArg(1),
        length: LengthRule::LongerOf(1, 2),
        needs_table: false,
        check: Some(check_iif),
        handler: iif,
    },
    def("INT", &[A::Numeric], 1, R::Numeric, LengthRule::Fixed(4), int),
    def("ISALPHA", &[A::Character], 1, R::Logical, LengthRule::Fixed(1), isalpha),
    def("ISLOWER", &[A::Character], 1, R::Logical, LengthRule::Fixed(1), islower),
    def("ISUPPER", &[A::Character], 1, R::Logical, LengthRule::Fixed(1), isupper),
    def("LEFT", &[A::Character, A::Numeric], 2, R::Character, LengthRule::ArgValue(1), left),
    def("LEN", &[A::Character], 1, R::Numeric, LengthRule::Fixed(4), len),
    def("LOG", &[A::Numeric], 1, R::Numeric, LengthRule::Fixed(4), log),
    def("LOWER", &[A::Character], 1, R::Character, LengthRule::ArgLength(0), lower),
    def("LTRIM", &[A::Character], 1, R::Character, LengthRule::ArgLength(0), ltrim),
    def("MAX", &[A::Numeric, A::Numeric], 2, R::Numeric, LengthRule::Fixed(4), max),
    def("MIN", &[A::Numeric, A::Numeric], 2, R::Numeric, LengthRule::Fixed(4), min),
    def("MONTH", &[A::Date], 1, R::Numeric, LengthRule::Fixed(4), month),
    table_def("RECCOUNT", R::Numeric, LengthRule::Fixed(4), reccount),
    table_def("RECNO", R::Numeric, LengthRule::Fixed(4), recno),
    def("REPLICATE", &[A::Character, A::Numeric], 2, R::Character, LengthRule::Replicate, replicate),
    def("RIGHT", &[A::Character, A::Numeric], 2, R::Character, LengthRule::ArgValue(1), right),
    def("RTRIM", &[A::Character], 1, R::Character, LengthRule::ArgLength(0), rtrim),
    def("SPACE", &[A::Numeric], 1, R::Character, LengthRule::ArgValue(0), space),
    def("SQRT", &[A::Numeric], 1, R::Numeric, LengthRule::Fixed(4), sqrt),
    def("STOD", &[A::Character], 1, R::Date, LengthRule::Fixed(8), stod),
    def(
        "STR",
        &[A::Numeric, A::Numeric, A::Numeric, A::Character],
        1,
        R::Character,
        LengthRule::ArgValueOr(1, 10),
        str_fmt,
    ),
    def(
        "STRZERO",
        &[A::Numeric, A::Numeric, A::Numeric],
        3,
        R::Character,
        LengthRule::ArgValue(1),
        strzero,
    ),
    def(
        "SUBSTR",
        &[A::Character, A::Numeric, A::Numeric],
        3,
        R::Character,
        LengthRule::ArgValue(2),
        substr,
    ),
    def("TRIM", &[A::Character], 1, R::Character, LengthRule::ArgLength(0), rtrim),
    def("UPPER", &[A::Character], 1, R::Character, LengthRule::ArgLength(0), upper),
    def("VAL", &[A::Character], 1, R::Numeric, LengthRule::Fixed(4), val),
    def("YEAR", &[A::Date], 1, R::Numeric, LengthRule::Fixed(4), year),
];

fn check_iif(def: &FunctionDef, args: &[Node]) -> ExpressionResult<()> {
    let (t, f) = (&args[1], &args[2]);
    if t.return_type != f.return_type {
        return Err(ExpressionError::incompatible(
            def.name,
            &[t.return_type, f.return_type],
        ));
    }
    if t.return_type == ReturnType::Character && t.result_len != f.result_len {
        return Err(ExpressionError::InconsistentParmLens {
            function: def.name.to_string(),
            left: t.result_len,
            right: f.result_len,
        });
    }
    Ok(())
}

fn bound_table<'a>(ctx: &FunctionContext<'a>, args: &Args<'_>) -> ExpressionResult<&'a dyn Table> {
    ctx.table
        .ok_or_else(|| args.invalid("no table is bound to this expression"))
}

fn character(s: String) -> ExpressionResult<Value> {
    Ok(Value::Character(s))
}

fn numeric(n: f64) -> ExpressionResult<Value> {
    Ok(Value::Numeric(n))
}

/// Map an optional date, keeping blank dates blank.
fn on_date<T>(d: Option<NaiveDate>, f: impl FnOnce(NaiveDate) -> T, blank: T) -> T {
    d.map(f).unwrap_or(blank)
}

fn abs(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(args.numeric(0)?.abs())
}

fn alltrim(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(args.character(0)?.trim_matches(' ').to_string())
}

fn asc(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    match args.character(0)?.chars().next() {
        Some(c) => numeric(c as u32 as f64),
        None => Err(args.invalid("empty string")),
    }
}

/// Position of the first argument inside the second, 1-based, 0 when absent.
fn at(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let needle = args.character(0)?;
    let haystack = args.character(1)?;
    if needle.is_empty() {
        return numeric(0.0);
    }
    let position = haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count() + 1)
        .unwrap_or(0);
    numeric(position as f64)
}

fn cdow(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let name = on_date(args.date(0)?, date::day_name, "");
    character(name.to_string())
}

fn chr(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let code = args.numeric(0)?;
    if !(0.0..=255.0).contains(&code) {
        return Err(args.invalid("character code must be 0-255"));
    }
    character(char::from(code as u8).to_string())
}

fn cmonth(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let name = on_date(args.date(0)?, date::month_name, "");
    character(name.to_string())
}

fn ctod(ctx: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let text = args.character(0)?;
    parse_date_text(text, ctx.config).map(Value::Date)
}

/// Parse date text laid out like the configured picture; blank text is a blank date.
pub(crate) fn parse_date_text(
    text: &str,
    config: &ExpressionConfig,
) -> ExpressionResult<Option<NaiveDate>> {
    if text.chars().all(|c| !c.is_ascii_digit()) {
        return Ok(None);
    }
    date::parse_picture(text, &config.date_format, config.reference_year())
        .map(Some)
        .ok_or_else(|| ExpressionError::InvalidDate {
            text: text.to_string(),
        })
}

fn today(_: &FunctionContext<'_>, _: &Args<'_>) -> ExpressionResult<Value> {
    Ok(Value::Date(Some(date::today())))
}

fn day(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(on_date(args.date(0)?, |d| d.day() as f64, 0.0))
}

fn del(ctx: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let deleted = bound_table(ctx, args)?.is_current_record_deleted()?;
    character(if deleted { "*" } else { " " }.to_string())
}

fn deleted(ctx: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let deleted = bound_table(ctx, args)?.is_current_record_deleted()?;
    Ok(Value::Logical(deleted))
}

/// Invert the sort order of a value of any type.
fn descend(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    match args.value(0)? {
        Value::Character(s) => character(
            s.chars()
                .map(|c| match u8::try_from(c) {
                    Ok(b) => char::from(255 - b),
                    Err(_) => c,
                })
                .collect(),
        ),
        Value::Numeric(n) => numeric(-n),
        Value::Date(d) => Ok(Value::Date(d.and_then(date::descend))),
        Value::Logical(b) => Ok(Value::Logical(!b)),
    }
}

fn dow(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(on_date(args.date(0)?, |d| date::day_of_week(d) as f64, 0.0))
}

fn dtoc(ctx: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let picture = &ctx.config.date_format;
    let text = match args.date(0)? {
        Some(d) => date::format_picture(d, picture),
        None => picture
            .chars()
            .map(|c| if c.is_ascii_alphabetic() { ' ' } else { c })
            .collect(),
    };
    character(text)
}

fn dtos(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(date::format_date8(args.date(0)?))
}

fn exp(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(args.numeric(0)?.exp())
}

fn iif(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let (t, f) = (args.value(1)?, args.value(2)?);
    if let (Value::Character(a), Value::Character(b)) = (t, f) {
        let (left, right) = (a.chars().count(), b.chars().count());
        if left != right {
            return Err(ExpressionError::InconsistentParmLens {
                function: "IIF".to_string(),
                left,
                right,
            });
        }
    }
    Ok(if args.logical(0)? { t.clone() } else { f.clone() })
}

fn int(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(args.numeric(0)?.trunc())
}

fn first_char_is(args: &Args<'_>, test: fn(&char) -> bool) -> ExpressionResult<Value> {
    let first = args.character(0)?.chars().next();
    Ok(Value::Logical(first.as_ref().is_some_and(test)))
}

fn isalpha(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    first_char_is(args, char::is_ascii_alphabetic)
}

fn islower(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    first_char_is(args, char::is_ascii_lowercase)
}

fn isupper(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    first_char_is(args, char::is_ascii_uppercase)
}

fn left(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let count = args.count(1)?;
    character(args.character(0)?.chars().take(count).collect())
}

fn len(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(args.character(0)?.chars().count() as f64)
}

fn log(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let n = args.numeric(0)?;
    if n <= 0.0 {
        return Err(args.invalid("logarithm of a non-positive number"));
    }
    numeric(n.ln())
}

fn lower(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(args.character(0)?.to_lowercase())
}

fn ltrim(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(args.character(0)?.trim_start_matches(' ').to_string())
}

fn max(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(args.numeric(0)?.max(args.numeric(1)?))
}

fn min(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(args.numeric(0)?.min(args.numeric(1)?))
}

fn month(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(on_date(args.date(0)?, |d| d.month() as f64, 0.0))
}

fn reccount(ctx: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(bound_table(ctx, args)?.record_count()? as f64)
}

fn recno(ctx: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(bound_table(ctx, args)?.current_record_number() as f64)
}

fn replicate(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let s = args.character(0)?;
    let count = args.count(1)?;
    match s.chars().count().checked_mul(count) {
        Some(total) if total <= MAX_CHARACTER_LEN => character(s.repeat(count)),
        _ => Err(args.invalid("result too long")),
    }
}

fn right(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let s = args.character(0)?;
    let total = s.chars().count();
    let count = args.count(1)?.min(total);
    character(s.chars().skip(total - count).collect())
}

fn rtrim(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(args.character(0)?.trim_end_matches(' ').to_string())
}

fn space(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(" ".repeat(args.count(0)?))
}

fn sqrt(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let n = args.numeric(0)?;
    if n < 0.0 {
        return Err(args.invalid("square root of a negative number"));
    }
    numeric(n.sqrt())
}

fn stod(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let text = args.character(0)?;
    if text.trim().is_empty() {
        return Ok(Value::Date(None));
    }
    date::parse_date8(text)
        .map(|d| Value::Date(Some(d)))
        .ok_or_else(|| ExpressionError::InvalidDate {
            text: text.to_string(),
        })
}

/// Replace an over-wide rendering with asterisks.
fn fit_width(text: String, width: usize) -> String {
    if text.chars().count() > width {
        "*".repeat(width)
    } else {
        text
    }
}

/// `STR(n [, len [, decimals [, pad]]])`, right justified.
fn str_fmt(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let n = args.numeric(0)?;
    let width = if args.len() > 1 { args.count(1)? } else { 10 };
    let decimals = if args.len() > 2 { args.count(2)? } else { 0 };
    let text = fit_width(format!("{:>width$.decimals$}", n), width);

    let pad = if args.len() > 3 {
        args.character(3)?.chars().next()
    } else {
        None
    };
    match pad {
        Some(p) if p != ' ' => {
            let leading = text.chars().take_while(|&c| c == ' ').count();
            let rest: String = text.chars().skip(leading).collect();
            character(format!("{}{}", p.to_string().repeat(leading), rest))
        }
        _ => character(text),
    }
}

/// `STRZERO(n, len, decimals)`, zero filled on the left.
fn strzero(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let n = args.numeric(0)?;
    let width = args.count(1)?;
    let decimals = args.count(2)?;
    let text = if n < 0.0 {
        format!("{:+0width$.decimals$}", n)
    } else {
        format!("{:0width$.decimals$}", n)
    };
    character(fit_width(text, width))
}

/// `SUBSTR(s, start, len)` with a 1-based start.
fn substr(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let start = args.count(1)?.max(1);
    let count = args.count(2)?;
    character(
        args.character(0)?
            .chars()
            .skip(start - 1)
            .take(count)
            .collect(),
    )
}

fn upper(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    character(args.character(0)?.to_uppercase())
}

/// Leading numeric prefix of the text, 0 when there is none.
fn val(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    let text = args.character(0)?.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_from = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end > digits_from && matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        if bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            end = exp_end;
        }
    }

    numeric(text[..end].parse().unwrap_or(0.0))
}

fn year(_: &FunctionContext<'_>, args: &Args<'_>) -> ExpressionResult<Value> {
    numeric(on_date(args.date(0)?, |d| d.year() as f64, 0.0))
}

/// Shift a date by a whole number of days; blank dates stay blank.
///
/// A shift that leaves the calendar range fails with `InvalidDate`.
pub(crate) fn add_days(d: Option<NaiveDate>, days: f64) -> ExpressionResult<Option<NaiveDate>> {
    let Some(d) = d else {
        return Ok(None);
    };
    Duration::try_days(days.trunc() as i64)
        .and_then(|shift| d.checked_add_signed(shift))
        .map(Some)
        .ok_or_else(|| ExpressionError::InvalidDate {
            text: format!("{} {:+} days", date::format_date8(Some(d)), days.trunc()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> ExpressionResult<Value> {
        let config = ExpressionConfig::default().with_century_reference_year(2017);
        let ctx = FunctionContext {
            table: None,
            config: &config,
        };
        lookup(name).unwrap().call(&ctx, &args)
    }

    fn c(s: &str) -> Value {
        Value::Character(s.to_string())
    }

    fn n(v: f64) -> Value {
        Value::Numeric(v)
    }

    fn d(s: &str) -> Value {
        Value::Date(date::parse_date8(s))
    }

    #[test]
    fn test_catalog_sorted_and_lookup() {
        assert!(FUNCTIONS.windows(2).all(|w| w[0].name < w[1].name));
        assert_eq!(lookup("substr").unwrap().name, "SUBSTR");
        assert!(lookup("NOSUCH").is_none());
        assert_eq!(catalog().len(), 45);
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("SUBSTR", vec![c("SOMESTRING"), n(3.0), n(5.0)]).unwrap(), c("MESTR"));
        assert_eq!(call("TRIM", vec![c("   abc123   ")]).unwrap(), c("   abc123"));
        assert_eq!(call("LTRIM", vec![c("   abc123   ")]).unwrap(), c("abc123   "));
        assert_eq!(call("ALLTRIM", vec![c("   abc123   ")]).unwrap(), c("abc123"));
        assert_eq!(call("LEFT", vec![c("ABCDEF"), n(2.0)]).unwrap(), c("AB"));
        assert_eq!(call("RIGHT", vec![c("ABCDEF"), n(2.0)]).unwrap(), c("EF"));
        assert_eq!(call("RIGHT", vec![c("AB"), n(5.0)]).unwrap(), c("AB"));
        assert_eq!(call("REPLICATE", vec![c("ab"), n(3.0)]).unwrap(), c("ababab"));
        assert_eq!(call("SPACE", vec![n(3.0)]).unwrap(), c("   "));
        assert_eq!(call("UPPER", vec![c("abc")]).unwrap(), c("ABC"));
        assert_eq!(call("LOWER", vec![c("ABC")]).unwrap(), c("abc"));
        assert_eq!(call("LEN", vec![c("ABC ")]).unwrap(), n(4.0));
        assert_eq!(call("CHR", vec![n(66.0)]).unwrap(), c("B"));
        assert_eq!(call("ASC", vec![c("A")]).unwrap(), n(65.0));
        assert!(call("ASC", vec![c("")]).is_err());
    }

    #[test]
    fn test_at_and_val() {
        assert_eq!(call("AT", vec![c(","), c("Booth, Joseph")]).unwrap(), n(6.0));
        assert_eq!(call("AT", vec![c("x"), c("Booth")]).unwrap(), n(0.0));
        assert_eq!(call("VAL", vec![c("22.13 and some text")]).unwrap(), n(22.13));
        assert_eq!(call("VAL", vec![c("  -7")]).unwrap(), n(-7.0));
        assert_eq!(call("VAL", vec![c("abc")]).unwrap(), n(0.0));
        assert_eq!(call("VAL", vec![c("1e3x")]).unwrap(), n(1000.0));
    }

    #[test]
    fn test_str_and_strzero() {
        assert_eq!(call("STR", vec![n(123.0)]).unwrap(), c("       123"));
        assert_eq!(call("STR", vec![n(3.0), n(4.0)]).unwrap(), c("   3"));
        assert_eq!(call("STR", vec![n(12.7), n(5.0), n(2.0)]).unwrap(), c("12.70"));
        assert_eq!(
            call("STR", vec![n(43.17), n(9.0), n(4.0), c("0")]).unwrap(),
            c("0043.1700")
        );
        assert_eq!(call("STR", vec![n(123456.0), n(3.0)]).unwrap(), c("***"));
        assert_eq!(
            call("STRZERO", vec![n(56.21), n(9.0), n(4.0)]).unwrap(),
            c("0056.2100")
        );
        assert_eq!(
            call("STRZERO", vec![n(-56.21), n(9.0), n(4.0)]).unwrap(),
            c("-056.2100")
        );
    }

    #[test]
    fn test_numeric_functions() {
        assert_eq!(call("ABS", vec![n(-3.5)]).unwrap(), n(3.5));
        assert_eq!(call("INT", vec![n(-3.7)]).unwrap(), n(-3.0));
        assert_eq!(call("MAX", vec![n(1.0), n(2.0)]).unwrap(), n(2.0));
        assert_eq!(call("MIN", vec![n(1.0), n(2.0)]).unwrap(), n(1.0));
        assert_eq!(call("SQRT", vec![n(16.0)]).unwrap(), n(4.0));
        assert_eq!(call("EXP", vec![n(0.0)]).unwrap(), n(1.0));
        assert_eq!(call("LOG", vec![n(1.0)]).unwrap(), n(0.0));
        assert!(call("LOG", vec![n(0.0)]).is_err());
        assert!(call("SQRT", vec![n(-1.0)]).is_err());
    }

    #[test]
    fn test_date_functions() {
        assert_eq!(call("DTOS", vec![d("19890303")]).unwrap(), c("19890303"));
        assert_eq!(call("DTOC", vec![d("19890303")]).unwrap(), c("03/03/89"));
        assert_eq!(call("DTOC", vec![Value::Date(None)]).unwrap(), c("  /  /  "));
        assert_eq!(call("CDOW", vec![d("20171014")]).unwrap(), c("Saturday"));
        assert_eq!(call("CMONTH", vec![d("20171101")]).unwrap(), c("November"));
        assert_eq!(call("DOW", vec![d("20171017")]).unwrap(), n(3.0));
        assert_eq!(call("DAY", vec![d("20171014")]).unwrap(), n(14.0));
        assert_eq!(call("MONTH", vec![d("20171014")]).unwrap(), n(10.0));
        assert_eq!(call("YEAR", vec![d("20171014")]).unwrap(), n(2017.0));
        assert_eq!(call("STOD", vec![c("20171014")]).unwrap(), d("20171014"));
        assert!(matches!(
            call("STOD", vec![c("20171350")]),
            Err(ExpressionError::InvalidDate { .. })
        ));
        assert_eq!(call("CTOD", vec![c("10/14/17")]).unwrap(), d("20171014"));
        assert_eq!(call("CTOD", vec![c("03\\03\\89")]).unwrap(), d("19890303"));
        assert_eq!(call("CTOD", vec![c("  /  /  ")]).unwrap(), Value::Date(None));
        assert_eq!(call("YEAR", vec![Value::Date(None)]).unwrap(), n(0.0));
    }

    #[test]
    fn test_descend() {
        assert_eq!(call("DESCEND", vec![c("AB")]).unwrap(), c("\u{be}\u{bd}"));
        assert_eq!(call("DESCEND", vec![n(5.0)]).unwrap(), n(-5.0));
        assert_eq!(call("DESCEND", vec![d("19890303")]).unwrap(), d("29101031"));
    }

    #[test]
    fn test_iif() {
        assert_eq!(
            call("IIF", vec![Value::Logical(true), c("yes"), c("no ")]).unwrap(),
            c("yes")
        );
        assert_eq!(
            call("IIF", vec![Value::Logical(false), n(1.0), n(2.0)]).unwrap(),
            n(2.0)
        );
        assert!(matches!(
            call("IIF", vec![Value::Logical(true), c("yes"), c("no")]),
            Err(ExpressionError::InconsistentParmLens { left: 3, right: 2, .. })
        ));
    }

    #[test]
    fn test_table_functions_need_table() {
        assert!(matches!(
            call("RECNO", vec![]),
            Err(ExpressionError::InvalidParm { .. })
        ));
    }

    #[test]
    fn test_counts_are_bounded() {
        assert!(matches!(
            call("SPACE", vec![n(99999999999999999999.0)]),
            Err(ExpressionError::InvalidParm { .. })
        ));
        assert!(matches!(
            call("REPLICATE", vec![c("ab"), n(40000.0)]),
            Err(ExpressionError::InvalidParm { .. })
        ));
        assert!(matches!(
            call("STR", vec![n(1.0), n(1e20)]),
            Err(ExpressionError::InvalidParm { .. })
        ));
        assert_eq!(call("SPACE", vec![n(-3.0)]).unwrap(), c(""));
        assert_eq!(call("REPLICATE", vec![c("ab"), n(3.0)]).unwrap(), c("ababab"));
    }

    #[test]
    fn test_add_days() {
        let base = date::parse_date8("20171230");
        assert_eq!(add_days(base, 6.0).unwrap(), date::parse_date8("20180105"));
        assert_eq!(add_days(base, -30.0).unwrap(), date::parse_date8("20171130"));
        assert_eq!(add_days(None, 6.0).unwrap(), None);
        assert!(matches!(
            add_days(base, 200_000_000_000_000.0),
            Err(ExpressionError::InvalidDate { .. })
        ));
        assert!(matches!(
            add_days(base, -1e300),
            Err(ExpressionError::InvalidDate { .. })
        ));
        assert_eq!(add_days(None, 1e300).unwrap(), None);
    }
}
