/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // one line, for tooling and listings
    pub long: &'static str,   // full explanation for --explain
}

/// Every stable error code winter can report.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "WIN-L001",
        short: "unexpected character",
        long: r#"## WIN-L001: unexpected character

A character was found that does not start any winter token.

**Example:**

    x = 'a';

Strings use double quotes (`"a"`); `&` and `|` only exist doubled as
`&&` and `||`.
"#,
    },
    ErrorEntry {
        code: "WIN-L002",
        short: "malformed string literal",
        long: r#"## WIN-L002: malformed string literal

A string literal was not closed on the same line, or used an escape
winter does not know.

Valid escapes are `\n`, `\t`, `\r`, `\0`, `\\` and `\"`.

**Example:**

    print("tab\q");
"#,
    },
    ErrorEntry {
        code: "WIN-L003",
        short: "integer literal too large",
        long: r#"## WIN-L003: integer literal too large

Integers are 64-bit signed. A literal above 9223372036854775807 cannot
be represented.

**Fix:** use a float literal (`1.0e20` style values can be written as
`100000000000000000000.0`).
"#,
    },

    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "WIN-P001",
        short: "expected an expression",
        long: r#"## WIN-P001: expected an expression

The parser needed a value (a literal, a name, a call, a list or
dictionary literal, a type name or a parenthesised expression) but
found something else.

**Example:**

    x = ;
"#,
    },
    ErrorEntry {
        code: "WIN-P002",
        short: "unexpected end of input",
        long: r#"## WIN-P002: unexpected end of input

The file ended in the middle of a statement, usually because a `}` or a
`;` is missing.

**Example:**

    loop { x = x + 1;
"#,
    },
    ErrorEntry {
        code: "WIN-P003",
        short: "expected a specific token",
        long: r#"## WIN-P003: expected a specific token

A particular token, such as `;`, `)` or `{`, was required here.

**Example:**

    x = 1 y = 2;   -- missing ';' after 'x = 1'
"#,
    },
    ErrorEntry {
        code: "WIN-P004",
        short: "expected a name",
        long: r#"## WIN-P004: expected a name

Function names, parameter names, record names, record field names and
`.field` accesses must be plain identifiers.

**Example:**

    func 1f() { }
"#,
    },
    ErrorEntry {
        code: "WIN-P005",
        short: "invalid assignment target",
        long: r#"## WIN-P005: invalid assignment target

Only a name (`x = ...`), an index (`l[0] = ...`) or a record field
(`p.x = ...`) can appear on the left of `=`.

**Example:**

    1 + 2 = 3;
"#,
    },
    ErrorEntry {
        code: "WIN-P006",
        short: "expected a type after 'as'",
        long: r#"## WIN-P006: expected a type after 'as'

Casts name one of the built-in types: `int`, `float`, `bool`, `string`,
`list` or `dict`.

**Example:**

    x = "12" as number;
"#,
    },

    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "WIN-C001",
        short: "break or continue outside a loop",
        long: r#"## WIN-C001: break or continue outside a loop

`break` and `continue` must appear inside a `loop` or `while` body.
A function body starts a fresh context: a loop around a `func`
declaration does not count.

**Example:**

    if done { break; }
"#,
    },
    ErrorEntry {
        code: "WIN-C002",
        short: "duplicate parameter or field name",
        long: r#"## WIN-C002: duplicate parameter or field name

Each parameter of a function, and each field of a record, must have a
distinct name.

**Example:**

    record Point { x, x }
"#,
    },
    ErrorEntry {
        code: "WIN-C003",
        short: "construct reached the compiler unlowered",
        long: r#"## WIN-C003: construct reached the compiler unlowered

`-` (binary), `!=`, `<=`, `>=` and `while` are rewritten into simpler
forms before compilation. Seeing this error means that rewrite was
skipped; it is a bug in winter.
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "WIN-R001",
        short: "operand types differ",
        long: r#"## WIN-R001: operand types differ

Binary operators require both operands to have the same type; there is
no implicit conversion.

**Example:**

    x = 1 + "a";

**Fix:** convert explicitly, e.g. `(1 as string) + "a"`.
"#,
    },
    ErrorEntry {
        code: "WIN-R002",
        short: "operator not defined for this type",
        long: r#"## WIN-R002: operator not defined for this type

The operator exists but does not apply to values of this type, such as
`-` on a string or `&&` on integers.
"#,
    },
    ErrorEntry {
        code: "WIN-R003",
        short: "name is not bound",
        long: r#"## WIN-R003: name is not bound

A name was read before anything was assigned to it, either in the
current function (including its captured closure) or globally.

**Example:**

    print(y);
"#,
    },
    ErrorEntry {
        code: "WIN-R004",
        short: "wrong number of arguments",
        long: r#"## WIN-R004: wrong number of arguments

A function or fixed-arity builtin was called with a different number of
arguments than it declares. `print` accepts any number.
"#,
    },
    ErrorEntry {
        code: "WIN-R005",
        short: "too many record fields",
        long: r#"## WIN-R005: too many record fields

Calling a record type constructs a record, filling fields in declaration
order. Fewer arguments than fields is allowed (the rest are `none`);
more is not.

**Example:**

    record Point { x, y }
    p = Point(1, 2, 3);
"#,
    },
    ErrorEntry {
        code: "WIN-R006",
        short: "index out of bounds",
        long: r#"## WIN-R006: index out of bounds

List and string indices are zero-based and must be in `0..length`.
"#,
    },
    ErrorEntry {
        code: "WIN-R007",
        short: "dictionary key not found",
        long: r#"## WIN-R007: dictionary key not found

Reading `d[k]` requires `k` to be present. Keys only match values of
the same type: `1` and `1.0` are different keys.
"#,
    },
    ErrorEntry {
        code: "WIN-R008",
        short: "record has no such field",
        long: r#"## WIN-R008: record has no such field

`p.f` and `p["f"]` must name a field declared by the record's type.
"#,
    },
    ErrorEntry {
        code: "WIN-R009",
        short: "value cannot be indexed this way",
        long: r#"## WIN-R009: value cannot be indexed this way

Lists and strings take integer indices, dictionaries take any key and
records take field-name strings. Other values cannot be indexed.
"#,
    },
    ErrorEntry {
        code: "WIN-R010",
        short: "value cannot be assigned into this way",
        long: r#"## WIN-R010: value cannot be assigned into this way

Index assignment works on lists (integer index), dictionaries (any key)
and records (field name). Strings are immutable.
"#,
    },
    ErrorEntry {
        code: "WIN-R011",
        short: "value is not callable",
        long: r#"## WIN-R011: value is not callable

Only functions, builtins and record types can be called.

**Example:**

    x = 3;
    x();
"#,
    },
    ErrorEntry {
        code: "WIN-R012",
        short: "unsupported cast",
        long: r#"## WIN-R012: unsupported cast

Every value casts to `string` and to its own type. Beyond that: `int`
casts to `float` and `bool`, `float` to `int`, `bool` to `int`, and
`string` to `int`, `float`, `bool` and `list`.
"#,
    },
    ErrorEntry {
        code: "WIN-R013",
        short: "string is not a number",
        long: r#"## WIN-R013: string is not a number

A string cast to `int`, `float` or `bool` must contain exactly that
value's textual form.

**Example:**

    n = "12a" as int;
"#,
    },
    ErrorEntry {
        code: "WIN-R014",
        short: "builtin given the wrong argument type",
        long: r#"## WIN-R014: builtin given the wrong argument type

`assert` takes a bool; `list_append`, `list_pop` and `list_count` take a
list as their first argument.
"#,
    },
    ErrorEntry {
        code: "WIN-R015",
        short: "condition is not a bool",
        long: r#"## WIN-R015: condition is not a bool

`if`, `else if` and `while` conditions must evaluate to `true` or
`false`. There is no truthiness.

**Fix:** compare explicitly, e.g. `if n != 0 { ... }`.
"#,
    },
    ErrorEntry {
        code: "WIN-R016",
        short: "equality not supported for this type",
        long: r#"## WIN-R016: equality not supported for this type

Lists, dictionaries and records cannot be compared with `==`. Compare
their elements or fields instead.
"#,
    },
    ErrorEntry {
        code: "WIN-R017",
        short: "assertion failed",
        long: r#"## WIN-R017: assertion failed

`assert(c)` was called with `c` equal to `false`. Execution stops.
"#,
    },
    ErrorEntry {
        code: "WIN-R018",
        short: "return outside a function",
        long: r#"## WIN-R018: return outside a function

`return` is only meaningful inside a function body.
"#,
    },
    ErrorEntry {
        code: "WIN-R019",
        short: "pop from an empty list",
        long: r#"## WIN-R019: pop from an empty list

`list_pop` needs at least one element. Check `list_count` first.
"#,
    },
    ErrorEntry {
        code: "WIN-R020",
        short: "call stack overflow",
        long: r#"## WIN-R020: call stack overflow

Calls nested deeper than the configured limit (1024 frames by default,
see `--max-call-depth`). Usually a recursive function with no base case.
"#,
    },

    // ── Internal ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "WIN-I001",
        short: "dictionary keys and values out of sync",
        long: r#"## WIN-I001: dictionary keys and values out of sync

A dictionary's key list, value list and size disagreed. This is a bug
in winter; please report it with the script that triggered it.
"#,
    },
    ErrorEntry {
        code: "WIN-I002",
        short: "stale or unknown heap handle",
        long: r#"## WIN-I002: stale or unknown heap handle

The machine used a heap handle whose object had already been collected.
This means a reference count dropped to zero too early: a bug in winter.
"#,
    },
    ErrorEntry {
        code: "WIN-I003",
        short: "heap object of unexpected kind",
        long: r#"## WIN-I003: heap object of unexpected kind

A handle tagged as one value type pointed at a different kind of object.
This is a bug in winter.
"#,
    },
    ErrorEntry {
        code: "WIN-I004",
        short: "loop instruction with no active loop",
        long: r#"## WIN-I004: loop instruction with no active loop

`LOOP_END`, `BREAK` or `CONTINUE` executed with no loop record on the
current frame. The compiler rejects `break`/`continue` outside loops, so
this indicates malformed bytecode.
"#,
    },
    ErrorEntry {
        code: "WIN-I005",
        short: "evaluation stack underflow",
        long: r#"## WIN-I005: evaluation stack underflow

An instruction popped more values than the stack held. This indicates
malformed bytecode.
"#,
    },
    ErrorEntry {
        code: "WIN-I006",
        short: "jump target out of range",
        long: r#"## WIN-I006: jump target out of range

Bytecode is validated before it runs; a jump or loop end pointed outside
its chunk.
"#,
    },
    ErrorEntry {
        code: "WIN-I007",
        short: "machine primed while running",
        long: r#"## WIN-I007: machine primed while running

New bytecode was installed before the previous statement finished.
"#,
    },
    ErrorEntry {
        code: "WIN-I008",
        short: "expected a name string",
        long: r#"## WIN-I008: expected a name string

`BIND`, `CREATE_FUNCTION` and `CREATE_CANON` take names from the stack;
a non-string was found there.
"#,
    },
    ErrorEntry {
        code: "WIN-I009",
        short: "heap value in a constant",
        long: r#"## WIN-I009: heap value in a constant

`PUSH` operands must be inline values. Strings, lists and other heap
values are created at run time by `CREATE_*` instructions.
"#,
    },
    ErrorEntry {
        code: "WIN-I010",
        short: "output failed",
        long: r#"## WIN-I010: output failed

Writing `print` output failed, for example because stdout was closed.
"#,
    },
];

/// Look up an error entry by code (e.g. `"WIN-R003"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}
