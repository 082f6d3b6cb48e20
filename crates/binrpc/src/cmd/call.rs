use std::time::Duration;

use binrpc_client::{connect_with_config, ClientConfig};
use binrpc_codec::Record;
use binrpc_transport::Endpoint;
use tracing::info;

use crate::cmd::CallArgs;
use crate::exit::{client_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_records, OutputFormat};

pub fn run(args: CallArgs, socket: Option<&str>, format: OutputFormat) -> CliResult<i32> {
    let socket = socket.ok_or_else(|| {
        CliError::new(USAGE, "no endpoint given (use --socket or BINRPC_SOCKET)")
    })?;
    let endpoint: Endpoint = socket
        .parse()
        .map_err(|err| transport_error("invalid --socket", err))?;
    let timeout = parse_duration(&args.timeout)?;
    let params = args
        .args
        .iter()
        .map(|arg| parse_arg(arg))
        .collect::<CliResult<Vec<_>>>()?;

    let config = ClientConfig {
        connect_timeout: Some(timeout),
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..ClientConfig::default()
    };
    let mut client =
        connect_with_config(&endpoint, &config).map_err(|err| client_error("connect failed", err))?;

    let records = client
        .issue(&args.method, &params)
        .map_err(|err| client_error("call failed", err))?;
    info!(method = %args.method, records = records.len(), "reply received");

    print_records(&args.method, &records, format);
    Ok(SUCCESS)
}

/// Type a command-line argument. Explicit prefixes win; bare values are
/// integers when they parse as one and text otherwise.
pub fn parse_arg(input: &str) -> CliResult<Record> {
    if let Some(text) = input.strip_prefix("s:") {
        return Ok(Record::string(text));
    }
    if let Some(number) = input.strip_prefix("i:") {
        return number
            .parse::<i64>()
            .map(Record::int)
            .map_err(|_| CliError::new(USAGE, format!("invalid integer argument: {input}")));
    }
    if let Some(number) = input.strip_prefix("d:") {
        return match number.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Record::double(value)),
            _ => Err(CliError::new(
                USAGE,
                format!("invalid double argument: {input}"),
            )),
        };
    }
    Ok(match input.parse::<i64>() {
        Ok(value) => Record::int(value),
        Err(_) => Record::string(input),
    })
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_arguments() {
        assert_eq!(parse_arg("s:42").unwrap(), Record::string("42"));
        assert_eq!(parse_arg("i:-7").unwrap(), Record::int(-7));
        assert_eq!(parse_arg("d:1.5").unwrap(), Record::double(1.5));
        assert_eq!(parse_arg("s:").unwrap(), Record::string(""));
    }

    #[test]
    fn bare_arguments() {
        assert_eq!(parse_arg("300").unwrap(), Record::int(300));
        assert_eq!(parse_arg("-1").unwrap(), Record::int(-1));
        assert_eq!(parse_arg("udp").unwrap(), Record::string("udp"));
        assert_eq!(parse_arg("1.5").unwrap(), Record::string("1.5"));
    }

    #[test]
    fn bad_prefixed_arguments_are_usage_errors() {
        assert_eq!(parse_arg("i:abc").unwrap_err().code, USAGE);
        assert_eq!(parse_arg("d:nan").unwrap_err().code, USAGE);
        assert_eq!(parse_arg("d:").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn missing_socket_is_usage_error() {
        let args = CallArgs {
            method: "core.version".into(),
            args: vec![],
            timeout: "1s".into(),
        };
        let err = run(args, None, OutputFormat::Json).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn malformed_socket_is_usage_error() {
        let args = CallArgs {
            method: "core.version".into(),
            args: vec![],
            timeout: "1s".into(),
        };
        let err = run(args, Some("tcp:nowhere"), OutputFormat::Json).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
