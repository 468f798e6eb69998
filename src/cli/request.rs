//! `bidlink request` handler.

use reqwest::Method;

use super::{CliContext, RequestArgs};
use crate::client::RequestSpec;
use crate::error::BidlinkError;

pub async fn handle_request(ctx: &CliContext, args: &RequestArgs) -> Result<(), BidlinkError> {
    let spec = build_spec(args)?;
    let response = ctx.client.request(spec).await?;
    match response.json::<serde_json::Value>() {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", response.body),
    }
    Ok(())
}

fn build_spec(args: &RequestArgs) -> Result<RequestSpec, BidlinkError> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| BidlinkError::InvalidArgument(format!("unknown method `{}`", args.method)))?;
    let mut spec = RequestSpec::new(method, args.path.clone());
    if let Some(raw) = &args.data {
        spec = spec.json(serde_json::from_str(raw)?);
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(method: &str, data: Option<&str>) -> RequestArgs {
        RequestArgs {
            method: method.to_string(),
            path: "gigs".to_string(),
            data: data.map(str::to_string),
        }
    }

    #[test]
    fn method_is_case_insensitive() {
        let spec = build_spec(&args("patch", None)).unwrap();
        assert_eq!(spec.method, Method::PATCH);
        assert!(spec.body.is_none());
    }

    #[test]
    fn invalid_json_body_is_rejected() {
        let err = build_spec(&args("POST", Some("{nope"))).unwrap_err();
        assert!(matches!(err, BidlinkError::Serialization(_)));
    }
}
