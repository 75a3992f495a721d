use clap::Parser as ClapParser;
use std::process;

use fremd::{CallConvention, ForeignFn, Library, Value, ValueType};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Library to load by path
    #[arg(long, help = "Path of the library to load")]
    lib: Option<String>,

    /// Library to load by bare system name
    #[arg(long, help = "System library name, decorated per platform")]
    system: Option<String>,

    /// Exported function to call
    #[arg(long, help = "Exported function name")]
    symbol: String,

    /// Declared return type
    #[arg(long, default_value = "void", help = "Return type name")]
    ret: String,

    /// Calling convention
    #[arg(long, default_value = "cdecl", help = "cdecl, stdcall or fastcall")]
    convention: String,

    /// Arguments as type:value literals, e.g. int32:-5 double:2.5 string:hi
    #[arg(help = "Call arguments as type:value literals")]
    args: Vec<String>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let library = match open_target(&cli) {
        Ok(library) => library,
        Err(message) => fail(&message),
    };

    let ret = match ValueType::from_name(&cli.ret) {
        Some(kind) => kind,
        None => fail(&format!("unknown return type '{}'", cli.ret)),
    };
    let convention = match CallConvention::from_name(&cli.convention) {
        Some(convention) => convention,
        None => fail(&format!("unknown convention '{}'", cli.convention)),
    };

    let mut values = Vec::with_capacity(cli.args.len());
    for arg in &cli.args {
        match parse_argument(arg) {
            Ok(value) => values.push(value),
            Err(message) => fail(&message),
        }
    }
    let params: Vec<ValueType> = values.iter().map(Value::kind).collect();

    let func: ForeignFn =
        match library.function(&cli.symbol, ret, params, convention) {
            Ok(func) => func,
            Err(err) => fail(&err.to_string()),
        };

    // SAFETY: the declared signature comes from the command line and is
    // trusted the same way a hand-written extern declaration would be
    let result = unsafe { func.call(&values) };
    match result {
        Ok(value) => println!("{value}"),
        Err(err) => fail(&err.to_string()),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn open_target(cli: &Cli) -> Result<Library, String> {
    match (&cli.lib, &cli.system) {
        (Some(path), None) => Library::open(path).map_err(|e| e.to_string()),
        (None, Some(name)) => {
            Library::open_system(name).map_err(|e| e.to_string())
        }
        _ => Err(String::from("exactly one of --lib and --system is required")),
    }
}

/// Parse one `type:value` literal into a call argument.
fn parse_argument(text: &str) -> Result<Value, String> {
    let (name, literal) = text
        .split_once(':')
        .ok_or_else(|| format!("expected type:value, got '{text}'"))?;
    let kind = ValueType::from_name(name)
        .ok_or_else(|| format!("unknown type name '{name}'"))?;

    let value = match kind {
        ValueType::Void => {
            return Err(String::from("void cannot be supplied as an argument"));
        }
        ValueType::Bool => match literal {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            other => return Err(format!("invalid bool literal '{other}'")),
        },
        ValueType::I8 => Value::I8(parse_number(kind, literal)?),
        ValueType::U8 => Value::U8(parse_number(kind, literal)?),
        ValueType::I16 => Value::I16(parse_number(kind, literal)?),
        ValueType::U16 => Value::U16(parse_number(kind, literal)?),
        ValueType::I32 => Value::I32(parse_number(kind, literal)?),
        ValueType::U32 => Value::U32(parse_number(kind, literal)?),
        ValueType::I64 => Value::I64(parse_number(kind, literal)?),
        ValueType::U64 => Value::U64(parse_number(kind, literal)?),
        ValueType::F32 => Value::F32(parse_number(kind, literal)?),
        ValueType::F64 => Value::F64(parse_number(kind, literal)?),
        ValueType::Pointer => Value::Pointer(parse_address(literal)?),
        ValueType::Str => Value::cstring(literal),
        ValueType::WStr => Value::wstring(literal),
        ValueType::Buffer => parse_buffer(literal)?,
    };
    Ok(value)
}

fn parse_number<T: std::str::FromStr>(
    kind: ValueType,
    literal: &str,
) -> Result<T, String> {
    literal.parse().map_err(|_| {
        format!("invalid {} literal '{literal}'", kind.name())
    })
}

fn parse_address(literal: &str) -> Result<usize, String> {
    let parsed = match literal.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => literal.parse(),
    };
    parsed.map_err(|_| format!("invalid pointer literal '{literal}'"))
}

/// Hex bytes, whitespace tolerated: `buffer:DEADBEEF`.
fn parse_buffer(literal: &str) -> Result<Value, String> {
    let digits: Vec<u32> = literal
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| {
            c.to_digit(16)
                .ok_or_else(|| format!("invalid hex digit '{c}' in buffer"))
        })
        .collect::<Result<_, _>>()?;
    if digits.len() % 2 != 0 {
        return Err(String::from("buffer hex must have an even digit count"));
    }
    let bytes = digits
        .chunks(2)
        .map(|pair| (pair[0] * 16 + pair[1]) as u8)
        .collect();
    Ok(Value::buffer(bytes))
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn literals_parse_into_their_kinds() {
        assert_eq!(parse_argument("int32:-5"), Ok(Value::I32(-5)));
        assert_eq!(parse_argument("uint64:42"), Ok(Value::U64(42)));
        assert_eq!(parse_argument("double:2.5"), Ok(Value::F64(2.5)));
        assert_eq!(parse_argument("bool:true"), Ok(Value::Bool(true)));
        assert_eq!(
            parse_argument("pointer:0x1000"),
            Ok(Value::Pointer(0x1000))
        );
        assert_eq!(parse_argument("string:hi"), Ok(Value::cstring("hi")));
        assert_eq!(parse_argument("wstring:hi"), Ok(Value::wstring("hi")));
        assert_eq!(
            parse_argument("buffer:DEADBEEF"),
            Ok(Value::buffer(vec![0xDE, 0xAD, 0xBE, 0xEF]))
        );
    }

    #[test]
    fn string_literals_may_contain_colons() {
        assert_eq!(
            parse_argument("string:a:b:c"),
            Ok(Value::cstring("a:b:c"))
        );
    }

    #[test]
    fn malformed_literals_are_reported() {
        assert!(parse_argument("int32").is_err());
        assert!(parse_argument("int32:ten").is_err());
        assert!(parse_argument("quux:1").is_err());
        assert!(parse_argument("void:").is_err());
        assert!(parse_argument("bool:maybe").is_err());
        assert!(parse_argument("buffer:ABC").is_err());
        assert!(parse_argument("buffer:XY").is_err());
        assert!(parse_argument("pointer:street").is_err());
    }
}
