//! 브리지 텍스트 프로토콜.
//!
//! 프레임 하나에 메시지 하나, 필드는 `|`로 구분합니다.
//!
//! 송신:
//! - `CONNECT`
//! - `LOAD_CONDITIONS`
//! - `LIST_CONDITIONS`
//! - `SEND_CONDITION|<화면>|<조건식>|<인덱스>|<조회방식>`
//! - `STOP_CONDITION|<화면>|<조건식>|<인덱스>`
//!
//! 수신:
//! - `LOGIN|<결과코드>`
//! - `CONDITION_VER|<결과>|<메시지>`
//! - `CONDITION_LIST|<인덱스>^<이름>;...`
//! - `SEND_ACK|<화면>|<조건식>|<결과>` (1: 승인)
//! - `REAL_CONDITION|<종목코드>|<I|D>|<조건식>|<인덱스>`
//! - `MARKET_STATUS|<값>`

use condwatch_core::{
    parse_condition_list, ConditionEvent, ConditionInfo, MarketPhase, ScreenId, SearchMode,
};

use crate::{BrokerError, BrokerEvent, BrokerResult};

const FIELD_SEP: char = '|';

/// 어댑터로 보내는 명령.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    Connect,
    LoadConditions,
    ListConditions,
    SendCondition {
        screen: ScreenId,
        condition_name: String,
        condition_index: i32,
        mode: SearchMode,
    },
    StopCondition {
        screen: ScreenId,
        condition_name: String,
        condition_index: i32,
    },
}

impl BridgeCommand {
    /// 텍스트 프레임으로 인코딩합니다.
    ///
    /// 조건식 이름에 구분자가 들어 있으면 에러입니다.
    pub fn encode(&self) -> BrokerResult<String> {
        match self {
            BridgeCommand::Connect => Ok("CONNECT".to_string()),
            BridgeCommand::LoadConditions => Ok("LOAD_CONDITIONS".to_string()),
            BridgeCommand::ListConditions => Ok("LIST_CONDITIONS".to_string()),
            BridgeCommand::SendCondition {
                screen,
                condition_name,
                condition_index,
                mode,
            } => {
                check_name(condition_name)?;
                Ok(format!(
                    "SEND_CONDITION|{}|{}|{}|{}",
                    screen,
                    condition_name,
                    condition_index,
                    mode.as_code()
                ))
            }
            BridgeCommand::StopCondition {
                screen,
                condition_name,
                condition_index,
            } => {
                check_name(condition_name)?;
                Ok(format!(
                    "STOP_CONDITION|{}|{}|{}",
                    screen, condition_name, condition_index
                ))
            }
        }
    }
}

fn check_name(name: &str) -> BrokerResult<()> {
    if name.is_empty() || name.contains(FIELD_SEP) {
        return Err(BrokerError::InvalidRequest(format!(
            "조건식 이름에 사용할 수 없는 값: {:?}",
            name
        )));
    }
    Ok(())
}

/// 어댑터에서 받은 메시지.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    /// 이벤트 채널로 전달할 콜백
    Event(BrokerEvent),
    /// `SEND_CONDITION`에 대한 응답
    SendAck {
        screen: String,
        condition_name: String,
        accepted: bool,
    },
    /// `LIST_CONDITIONS`에 대한 응답
    ConditionList(Vec<ConditionInfo>),
}

impl BridgeMessage {
    /// 텍스트 프레임을 해석합니다.
    pub fn parse(text: &str) -> BrokerResult<Self> {
        let text = text.trim_end_matches(['\r', '\n']);
        let (tag, rest) = text.split_once(FIELD_SEP).unwrap_or((text, ""));

        match tag {
            "LOGIN" => {
                let code = parse_int(rest, "로그인 결과")?;
                Ok(BridgeMessage::Event(BrokerEvent::Login(code)))
            }
            "CONDITION_VER" => {
                let (ret, message) = rest.split_once(FIELD_SEP).unwrap_or((rest, ""));
                let result = parse_int(ret, "조건식 로드 결과")?;
                Ok(BridgeMessage::Event(BrokerEvent::ConditionCatalogLoaded {
                    result,
                    message: message.to_string(),
                }))
            }
            "CONDITION_LIST" => {
                let list = parse_condition_list(rest)
                    .map_err(|e| BrokerError::Protocol(e.to_string()))?;
                Ok(BridgeMessage::ConditionList(list))
            }
            "SEND_ACK" => {
                // 조건식 이름은 가운데 필드 전체
                let fields: Vec<&str> = rest.split(FIELD_SEP).collect();
                if fields.len() < 3 {
                    return Err(malformed(text));
                }
                let ret = parse_int(fields[fields.len() - 1], "조건검색 요청 결과")?;
                Ok(BridgeMessage::SendAck {
                    screen: fields[0].to_string(),
                    condition_name: fields[1..fields.len() - 1].join("|"),
                    accepted: ret == 1,
                })
            }
            "REAL_CONDITION" => {
                let fields: Vec<&str> = rest.split(FIELD_SEP).collect();
                if fields.len() < 4 {
                    return Err(malformed(text));
                }
                let name = fields[2..fields.len() - 1].join("|");
                let event =
                    ConditionEvent::from_raw(fields[0], fields[1], &name, fields[fields.len() - 1])
                        .map_err(|e| BrokerError::Protocol(e.to_string()))?;
                Ok(BridgeMessage::Event(BrokerEvent::Condition(event)))
            }
            "MARKET_STATUS" => Ok(BridgeMessage::Event(BrokerEvent::MarketStatus(
                MarketPhase::from_raw(rest),
            ))),
            _ => Err(malformed(text)),
        }
    }
}

fn parse_int(raw: &str, what: &str) -> BrokerResult<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|e| BrokerError::Protocol(format!("{} 값 오류 {:?}: {}", what, raw, e)))
}

fn malformed(text: &str) -> BrokerError {
    BrokerError::Protocol(format!("알 수 없는 메시지: {:?}", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use condwatch_core::{ConditionEventKind, StockCode};

    #[test]
    fn test_encode_commands() {
        let screen = ScreenId::parse("100").unwrap();
        let send = BridgeCommand::SendCondition {
            screen: screen.clone(),
            condition_name: "급등주".to_string(),
            condition_index: 3,
            mode: SearchMode::Live,
        };
        assert_eq!(send.encode().unwrap(), "SEND_CONDITION|100|급등주|3|1");

        let stop = BridgeCommand::StopCondition {
            screen,
            condition_name: "급등주".to_string(),
            condition_index: 3,
        };
        assert_eq!(stop.encode().unwrap(), "STOP_CONDITION|100|급등주|3");
        assert_eq!(BridgeCommand::Connect.encode().unwrap(), "CONNECT");
    }

    #[test]
    fn test_encode_rejects_separator_in_name() {
        let cmd = BridgeCommand::StopCondition {
            screen: ScreenId::parse("100").unwrap(),
            condition_name: "a|b".to_string(),
            condition_index: 0,
        };
        assert!(matches!(cmd.encode(), Err(BrokerError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_login_and_catalog() {
        assert_eq!(
            BridgeMessage::parse("LOGIN|0").unwrap(),
            BridgeMessage::Event(BrokerEvent::Login(0))
        );
        assert_eq!(
            BridgeMessage::parse("CONDITION_VER|1|조건검색식 로드 완료\r\n").unwrap(),
            BridgeMessage::Event(BrokerEvent::ConditionCatalogLoaded {
                result: 1,
                message: "조건검색식 로드 완료".to_string(),
            })
        );
        match BridgeMessage::parse("CONDITION_LIST|000^급등주;001^거래량;").unwrap() {
            BridgeMessage::ConditionList(list) => {
                assert_eq!(list.len(), 2);
                assert_eq!(list[1].name, "거래량");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_real_condition() {
        let msg = BridgeMessage::parse("REAL_CONDITION|005930|I|급등주|003").unwrap();
        let expected = ConditionEvent::new(
            StockCode::parse("005930").unwrap(),
            ConditionEventKind::Insert,
            "급등주",
            3,
        );
        assert_eq!(msg, BridgeMessage::Event(BrokerEvent::Condition(expected)));
    }

    #[test]
    fn test_parse_send_ack() {
        assert_eq!(
            BridgeMessage::parse("SEND_ACK|100|급등주|1").unwrap(),
            BridgeMessage::SendAck {
                screen: "100".to_string(),
                condition_name: "급등주".to_string(),
                accepted: true,
            }
        );
        match BridgeMessage::parse("SEND_ACK|100|급등주|0").unwrap() {
            BridgeMessage::SendAck { accepted, .. } => assert!(!accepted),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert!(BridgeMessage::parse("HELLO").is_err());
        assert!(BridgeMessage::parse("LOGIN|abc").is_err());
        assert!(BridgeMessage::parse("REAL_CONDITION|005930|X|급등주|1").is_err());
        assert!(BridgeMessage::parse("SEND_ACK|100").is_err());
    }

    #[test]
    fn test_parse_market_status() {
        assert_eq!(
            BridgeMessage::parse("MARKET_STATUS|3").unwrap(),
            BridgeMessage::Event(BrokerEvent::MarketStatus(MarketPhase::AfterHoursClosed))
        );
    }
}
