use chrono::Utc;
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::types::{Side, TimeInForce};
use crate::utils::key_util::RequestSigner;

pub fn build_query(params: &[(&str, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Appends `recvWindow`, `timestamp` and the trailing `signature` parameter.
pub fn build_signed_query(
    signer: &RequestSigner,
    params: &[(&str, String)],
    recv_window_ms: u64,
    timestamp_ms: i64,
) -> Result<String, ExchangeError> {
    let mut all = params.to_vec();
    all.push(("recvWindow", recv_window_ms.to_string()));
    all.push(("timestamp", timestamp_ms.to_string()));

    let query = build_query(&all);
    let signature = signer.sign(&query)?;
    let encoded: String = form_urlencoded::byte_serialize(signature.as_bytes()).collect();
    Ok(format!("{}&signature={}", query, encoded))
}

pub fn timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Binance caps client order ids at 36 chars.
pub fn new_client_order_id() -> String {
    format!("ladder-{}", &Uuid::new_v4().simple().to_string()[..24])
}

pub fn build_market_order_params(symbol: &str, side: Side, quantity: f64) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", symbol.to_string()),
        ("side", side.as_str().to_string()),
        ("type", "MARKET".to_string()),
        ("quantity", quantity.to_string()),
        ("newClientOrderId", new_client_order_id()),
        ("newOrderRespType", "ACK".to_string()),
    ]
}

pub fn build_limit_order_params(
    symbol: &str,
    side: Side,
    price: f64,
    quantity: f64,
    time_in_force: TimeInForce,
) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", symbol.to_string()),
        ("side", side.as_str().to_string()),
        ("type", "LIMIT".to_string()),
        ("timeInForce", time_in_force.as_str().to_string()),
        ("quantity", quantity.to_string()),
        ("price", price.to_string()),
        ("newClientOrderId", new_client_order_id()),
        ("newOrderRespType", "ACK".to_string()),
    ]
}

/// Number of decimal places in an exchange decimal string such as `"0.0100"`.
pub fn decimal_places(value: &str) -> u32 {
    match value.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::key_util::RequestSigner;

    fn param<'a>(params: &'a [(&str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn signed_query_ends_with_signature_over_prefix() {
        let signer = RequestSigner::Hmac("secret".to_string());
        let query = build_signed_query(&signer, &[("symbol", "ETHUSDT".to_string())], 5000, 1_700_000_000_000).unwrap();

        let (prefix, sig) = query.rsplit_once("&signature=").unwrap();
        assert_eq!(prefix, "symbol=ETHUSDT&recvWindow=5000&timestamp=1700000000000");
        assert_eq!(sig, signer.sign(prefix).unwrap());
    }

    #[test]
    fn ed25519_signature_is_url_encoded() {
        let key = ed25519_dalek::SigningKey::from_bytes(&[3u8; 32]);
        let signer = RequestSigner::Ed25519(key);
        let query = build_signed_query(&signer, &[], 5000, 1).unwrap();
        let (_, sig) = query.rsplit_once("&signature=").unwrap();

        assert!(!sig.contains('+'));
        assert!(!sig.contains('/'));
        assert!(!sig.contains('='));
    }

    #[test]
    fn limit_order_params_carry_price_and_gtc() {
        let params = build_limit_order_params("ETHUSDT", Side::Sell, 2001.0, 0.003, TimeInForce::Gtc);

        assert_eq!(param(&params, "side"), Some("SELL"));
        assert_eq!(param(&params, "type"), Some("LIMIT"));
        assert_eq!(param(&params, "timeInForce"), Some("GTC"));
        assert_eq!(param(&params, "price"), Some("2001"));
        assert_eq!(param(&params, "quantity"), Some("0.003"));
        assert!(param(&params, "newClientOrderId").unwrap().len() <= 36);
    }

    #[test]
    fn market_order_params_have_no_price() {
        let params = build_market_order_params("ETHUSDT", Side::Buy, 0.002);

        assert_eq!(param(&params, "type"), Some("MARKET"));
        assert_eq!(param(&params, "price"), None);
        assert_eq!(param(&params, "timeInForce"), None);
    }

    #[test]
    fn counts_tick_decimals() {
        assert_eq!(decimal_places("0.01"), 2);
        assert_eq!(decimal_places("0.01000000"), 2);
        assert_eq!(decimal_places("0.10"), 1);
        assert_eq!(decimal_places("1"), 0);
        assert_eq!(decimal_places("1.000"), 0);
    }
}
