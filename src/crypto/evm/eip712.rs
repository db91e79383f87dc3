//! EIP-712 Typed Data Hashing
//!
//! 구조화된 데이터 인코딩. 등록 메시지처럼 chainId가 없는 도메인도 지원합니다.
//!
//! # 참조
//!
//! - [EIP-712: Typed structured data hashing and signing](https://eips.ethereum.org/EIPS/eip-712)

use super::keccak::{keccak256, pad_address, pad_bool, pad_u256};
use crate::errors::{CustodyError, CustodyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// EIP-712 도메인 분리자
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
}

impl Eip712Domain {
    /// name/version만 가진 도메인
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
            ..Default::default()
        }
    }

    /// 체인 ID 설정
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// 검증 컨트랙트 설정
    pub fn with_verifying_contract(mut self, contract: impl Into<String>) -> Self {
        self.verifying_contract = Some(contract.into());
        self
    }

    /// 도메인 타입 문자열 생성 (EIP712Domain(...))
    ///
    /// 존재하는 필드만 표준 순서대로 포함합니다.
    pub fn encode_type(&self) -> String {
        let mut fields = Vec::new();

        if self.name.is_some() {
            fields.push("string name");
        }
        if self.version.is_some() {
            fields.push("string version");
        }
        if self.chain_id.is_some() {
            fields.push("uint256 chainId");
        }
        if self.verifying_contract.is_some() {
            fields.push("address verifyingContract");
        }

        format!("EIP712Domain({})", fields.join(","))
    }

    /// 도메인 분리자 해시 계산
    pub fn separator(&self) -> CustodyResult<[u8; 32]> {
        let mut encoded = keccak256(self.encode_type().as_bytes()).to_vec();

        if let Some(ref name) = self.name {
            encoded.extend_from_slice(&keccak256(name.as_bytes()));
        }
        if let Some(ref version) = self.version {
            encoded.extend_from_slice(&keccak256(version.as_bytes()));
        }
        if let Some(chain_id) = self.chain_id {
            encoded.extend_from_slice(&pad_u256(chain_id));
        }
        if let Some(ref contract) = self.verifying_contract {
            encoded.extend_from_slice(&pad_address(&parse_address(contract)?));
        }

        Ok(keccak256(&encoded))
    }
}

/// EIP-712 필드 타입 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// EIP-712 타입 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712TypedData {
    /// 타입 정의 (EIP712Domain 제외)
    pub types: HashMap<String, Vec<TypedDataField>>,

    /// 주 타입 이름
    pub primary_type: String,

    pub domain: Eip712Domain,

    /// 메시지 데이터
    pub message: serde_json::Value,
}

impl Eip712TypedData {
    pub fn new(
        domain: Eip712Domain,
        primary_type: impl Into<String>,
        types: HashMap<String, Vec<TypedDataField>>,
        message: serde_json::Value,
    ) -> Self {
        Self {
            types,
            primary_type: primary_type.into(),
            domain,
            message,
        }
    }

    /// 주 타입 메시지의 구조체 해시
    pub fn hash_struct(&self) -> CustodyResult<[u8; 32]> {
        self.hash_struct_of(&self.primary_type, &self.message)
    }

    /// 전체 서명 해시
    ///
    /// keccak256("\x19\x01" || domainSeparator || hashStruct(message))
    pub fn sign_hash(&self) -> CustodyResult<[u8; 32]> {
        let mut data = Vec::with_capacity(2 + 32 + 32);
        data.extend_from_slice(&[0x19, 0x01]);
        data.extend_from_slice(&self.domain.separator()?);
        data.extend_from_slice(&self.hash_struct()?);

        Ok(keccak256(&data))
    }

    fn hash_struct_of(&self, type_name: &str, data: &serde_json::Value) -> CustodyResult<[u8; 32]> {
        let mut encoded = hash_type(type_name, &self.types)?.to_vec();

        let fields = self.types.get(type_name).ok_or_else(|| CustodyError::InvalidSignature {
            message: format!("Type not found: {type_name}"),
        })?;

        for field in fields {
            let value = data.get(&field.name).ok_or_else(|| CustodyError::InvalidSignature {
                message: format!("Field not found: {}", field.name),
            })?;
            encoded.extend_from_slice(&self.encode_value(&field.field_type, value)?);
        }

        Ok(keccak256(&encoded))
    }

    fn encode_value(&self, field_type: &str, value: &serde_json::Value) -> CustodyResult<[u8; 32]> {
        match field_type {
            "string" => {
                let s = value.as_str().ok_or_else(|| type_mismatch("string", value))?;
                Ok(keccak256(s.as_bytes()))
            },
            "address" => {
                let s = value.as_str().ok_or_else(|| type_mismatch("address", value))?;
                Ok(pad_address(&parse_address(s)?))
            },
            "bool" => {
                let b = value.as_bool().ok_or_else(|| type_mismatch("bool", value))?;
                Ok(pad_bool(b))
            },
            t if t.starts_with("uint") => {
                let n = value
                    .as_u64()
                    .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                    .ok_or_else(|| type_mismatch(t, value))?;
                Ok(pad_u256(n))
            },
            t if self.types.contains_key(t) => self.hash_struct_of(t, value),
            t => Err(CustodyError::InvalidSignature {
                message: format!("Unsupported type: {t}"),
            }),
        }
    }
}

/// 타입 인코딩 문자열 생성
///
/// 주 타입이 먼저 오고, 참조된 타입들은 알파벳 순으로 뒤에 붙습니다.
pub fn encode_type(
    type_name: &str,
    types: &HashMap<String, Vec<TypedDataField>>,
) -> CustodyResult<String> {
    let mut deps = Vec::new();
    collect_dependencies(type_name, types, &mut deps);
    deps.retain(|d| d != type_name);
    deps.sort();

    let mut result = format_type(type_name, types)?;
    for dep in deps {
        result.push_str(&format_type(&dep, types)?);
    }

    Ok(result)
}

/// 타입 해시 계산
pub fn hash_type(
    type_name: &str,
    types: &HashMap<String, Vec<TypedDataField>>,
) -> CustodyResult<[u8; 32]> {
    Ok(keccak256(encode_type(type_name, types)?.as_bytes()))
}

fn format_type(type_name: &str, types: &HashMap<String, Vec<TypedDataField>>) -> CustodyResult<String> {
    let fields = types.get(type_name).ok_or_else(|| CustodyError::InvalidSignature {
        message: format!("Type not found: {type_name}"),
    })?;

    let field_strings: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.field_type, f.name))
        .collect();

    Ok(format!("{}({})", type_name, field_strings.join(",")))
}

fn collect_dependencies(
    type_name: &str,
    types: &HashMap<String, Vec<TypedDataField>>,
    deps: &mut Vec<String>,
) {
    if deps.iter().any(|d| d == type_name) {
        return;
    }
    let Some(fields) = types.get(type_name) else {
        return;
    };

    deps.push(type_name.to_string());
    for field in fields {
        collect_dependencies(&field.field_type, types, deps);
    }
}

fn type_mismatch(expected: &str, value: &serde_json::Value) -> CustodyError {
    CustodyError::InvalidSignature {
        message: format!("Expected {expected}, got {value:?}"),
    }
}

pub(crate) fn parse_address(address: &str) -> CustodyResult<[u8; 20]> {
    let hex_str = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(hex_str).map_err(|e| CustodyError::InvalidSignature {
        message: format!("Invalid address hex: {e}"),
    })?;

    bytes.as_slice().try_into().map_err(|_| CustodyError::InvalidSignature {
        message: format!("Address must be 20 bytes, got {}", bytes.len()),
    })
}
