//! CEL standard library function declarations.
//!
//! Each declaration fixes the call style and arity of a built-in. Arities
//! count the receiver of a method call as the first argument, so
//! `"abc".contains("b")` and a hypothetical `contains("abc", "b")` both
//! have two arguments.

use crate::macros::ArgCount;

/// Dispatch target of a standard library function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Size,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Max,
    Min,
    // Conversions
    Int,
    UInt,
    Double,
    String,
    Bool,
    Bytes,
    Timestamp,
    Duration,
    Dyn,
    // Timestamp and duration accessors
    GetFullYear,
    GetMonth,
    GetDayOfYear,
    GetDayOfMonth,
    GetDate,
    GetDayOfWeek,
    GetHours,
    GetMinutes,
    GetSeconds,
    GetMilliseconds,
}

/// How a built-in may be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// `name(args...)`
    Global,
    /// `receiver.name(args...)`
    Receiver,
    /// Either form.
    Either,
}

impl CallStyle {
    pub fn allows_receiver(self) -> bool {
        matches!(self, CallStyle::Receiver | CallStyle::Either)
    }

    pub fn allows_global(self) -> bool {
        matches!(self, CallStyle::Global | CallStyle::Either)
    }
}

/// Declaration of a standard library function.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDecl {
    pub name: &'static str,
    pub builtin: Builtin,
    pub style: CallStyle,
    pub args: ArgCount,
}

const fn decl(
    name: &'static str,
    builtin: Builtin,
    style: CallStyle,
    args: ArgCount,
) -> FunctionDecl {
    FunctionDecl {
        name,
        builtin,
        style,
        args,
    }
}

const ACCESSOR_ARGS: ArgCount = ArgCount::Range(1, 2);

/// The CEL standard library.
pub static STANDARD_LIBRARY: &[FunctionDecl] = &[
    decl("size", Builtin::Size, CallStyle::Either, ArgCount::Exact(1)),
    decl("contains", Builtin::Contains, CallStyle::Receiver, ArgCount::Exact(2)),
    decl("startsWith", Builtin::StartsWith, CallStyle::Receiver, ArgCount::Exact(2)),
    decl("endsWith", Builtin::EndsWith, CallStyle::Receiver, ArgCount::Exact(2)),
    decl("matches", Builtin::Matches, CallStyle::Either, ArgCount::Exact(2)),
    decl("max", Builtin::Max, CallStyle::Global, ArgCount::AtLeast(1)),
    decl("min", Builtin::Min, CallStyle::Global, ArgCount::AtLeast(1)),
    decl("int", Builtin::Int, CallStyle::Global, ArgCount::Exact(1)),
    decl("uint", Builtin::UInt, CallStyle::Global, ArgCount::Exact(1)),
    decl("double", Builtin::Double, CallStyle::Global, ArgCount::Exact(1)),
    decl("string", Builtin::String, CallStyle::Global, ArgCount::Exact(1)),
    decl("bool", Builtin::Bool, CallStyle::Global, ArgCount::Exact(1)),
    decl("bytes", Builtin::Bytes, CallStyle::Global, ArgCount::Exact(1)),
    decl("timestamp", Builtin::Timestamp, CallStyle::Global, ArgCount::Exact(1)),
    decl("duration", Builtin::Duration, CallStyle::Global, ArgCount::Exact(1)),
    decl("dyn", Builtin::Dyn, CallStyle::Global, ArgCount::Exact(1)),
    decl("getFullYear", Builtin::GetFullYear, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getMonth", Builtin::GetMonth, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getDayOfYear", Builtin::GetDayOfYear, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getDayOfMonth", Builtin::GetDayOfMonth, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getDate", Builtin::GetDate, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getDayOfWeek", Builtin::GetDayOfWeek, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getHours", Builtin::GetHours, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getMinutes", Builtin::GetMinutes, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getSeconds", Builtin::GetSeconds, CallStyle::Receiver, ACCESSOR_ARGS),
    decl("getMilliseconds", Builtin::GetMilliseconds, CallStyle::Receiver, ACCESSOR_ARGS),
];

/// Look up a standard library function by name.
pub fn lookup(name: &str) -> Option<&'static FunctionDecl> {
    STANDARD_LIBRARY.iter().find(|f| f.name == name)
}

impl Builtin {
    /// The CEL-visible function name.
    pub fn name(self) -> &'static str {
        STANDARD_LIBRARY
            .iter()
            .find(|f| f.builtin == self)
            .map(|f| f.name)
            .unwrap_or("<builtin>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = STANDARD_LIBRARY.iter().map(|f| f.name).collect();
        assert_eq!(names.len(), STANDARD_LIBRARY.len());
    }

    #[test]
    fn every_builtin_has_a_name() {
        for decl in STANDARD_LIBRARY {
            assert_eq!(decl.builtin.name(), decl.name);
        }
    }

    #[test]
    fn lookup_finds_declarations() {
        let size = lookup("size").unwrap();
        assert_eq!(size.builtin, Builtin::Size);
        assert!(size.style.allows_global());
        assert!(size.style.allows_receiver());

        let month = lookup("getMonth").unwrap();
        assert!(month.args.matches(1));
        assert!(month.args.matches(2));
        assert!(!month.args.matches(3));
        assert!(!month.style.allows_global());

        assert!(lookup("exists").is_none());
        assert!(lookup("unknown").is_none());
    }
}
