//! Secure channel driven end to end against a scripted card

use std::collections::VecDeque;

use bytes::Bytes;
use hex_literal::hex;
use scp03::{
    CardTransport, ChannelConfig, Command, Error, ErrorKind, Scp03Channel, SecurityLevel,
    SessionState, StaticKeys, StatusWord, commands::KeyComponent, constants::DEFAULT_KEY,
    crypto::key_check_value,
};

const HOST_CHALLENGE: [u8; 8] = hex!("360CB43F4301B894");
const INITIALIZE_UPDATE_RESPONSE: &[u8] =
    &hex!("010B001F002500000000FF0360CAAFA4DAC615236ADD5607216F3E115C9000");
const INITIALIZE_UPDATE: &[u8] = &hex!("8050000008360CB43F4301B894");
const EXTERNAL_AUTHENTICATE: &[u8] = &hex!("848233001045330AB30BB1A079A8E7F77376DB9F2C");
const SUCCESS: &[u8] = &hex!("9000");

/// Replays canned responses and records every command it receives
#[derive(Debug, Default)]
struct ScriptedCard {
    responses: VecDeque<Bytes>,
    received: Vec<Bytes>,
}

impl ScriptedCard {
    fn new(responses: &[&[u8]]) -> Self {
        Self {
            responses: responses.iter().map(|r| Bytes::copy_from_slice(r)).collect(),
            received: Vec::new(),
        }
    }

    fn handshake(extra: &[&[u8]]) -> Self {
        let mut responses = vec![INITIALIZE_UPDATE_RESPONSE, SUCCESS];
        responses.extend_from_slice(extra);
        Self::new(&responses)
    }
}

impl CardTransport for ScriptedCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> scp03_apdu_core::Result<Bytes> {
        self.received.push(Bytes::copy_from_slice(command));
        self.responses
            .pop_front()
            .ok_or_else(|| scp03_apdu_core::Error::transmission("card removed"))
    }

    fn reset(&mut self) -> scp03_apdu_core::Result<()> {
        self.received.clear();
        Ok(())
    }
}

fn open(card: ScriptedCard) -> scp03::Result<Scp03Channel<ScriptedCard>> {
    Scp03Channel::open_with_challenge(
        card,
        &StaticKeys::default_keys(),
        ChannelConfig::default(),
        &HOST_CHALLENGE,
    )
}

#[test]
fn test_open_channel() {
    let channel = open(ScriptedCard::handshake(&[])).unwrap();
    assert_eq!(channel.session().state(), SessionState::SecureChannelActive);

    let card = channel.close();
    assert_eq!(card.received.len(), 2);
    assert_eq!(card.received[0].as_ref(), INITIALIZE_UPDATE);
    assert_eq!(card.received[1].as_ref(), EXTERNAL_AUTHENTICATE);
}

#[test]
fn test_transmit_sequence() {
    let card = ScriptedCard::handshake(&[
        &hex!(
            "63bad972be4752aa8fb5cc7acaccec84d2e10b74fabed336a4964ca94f16be30"
            "34ba5fc3035114dd9000"
        ),
        &hex!("0aa1b2599b3c81a89000"),
        &hex!("3dc5d268b93678bc24e7ab44ed6af83d5bd8828fe71cdc6e9000"),
    ]);
    let mut channel = open(card).unwrap();

    let response = channel
        .transmit(
            &Command::new(0x80, 0xF2, 0x80, 0x02)
                .with_data(hex!("4F00").to_vec())
                .with_le(0x00),
        )
        .unwrap();
    assert_eq!(response.payload(), hex!("E3104F08A000000151000000C5039E0000"));

    let response = channel
        .transmit(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
        .unwrap();
    assert!(response.is_success());
    assert!(response.payload().is_empty());

    let response = channel
        .transmit(&Command::new(0x80, 0xE2, 0x90, 0x00).with_data(hex!("0102030405").to_vec()))
        .unwrap();
    assert_eq!(response.payload(), hex!("AABBCC"));
    assert_eq!(channel.session().encryption_counter(), 4);

    let card = channel.close();
    assert_eq!(
        card.received[2].as_ref(),
        hex!("84f2800218b066f426ba7a5a8046150048caacc06b48fbf5707b479e1500")
    );
    assert_eq!(card.received[3].as_ref(), hex!("84ca006608c1c15ddf812e700c00"));
    assert_eq!(
        card.received[4].as_ref(),
        hex!("84e290001815e41b707f615a719a0faef2f27a17e72f5c91f1d22fd801")
    );
}

#[test]
fn test_put_key() {
    let card = ScriptedCard::handshake(&[
        &hex!(
            "63bad972be4752aa8fb5cc7acaccec84d2e10b74fabed336a4964ca94f16be30"
            "34ba5fc3035114dd9000"
        ),
        &hex!("0aa1b2599b3c81a89000"),
        &hex!("3dc5d268b93678bc24e7ab44ed6af83d5bd8828fe71cdc6e9000"),
        &hex!("5f1ca8fc679e14d1b43415399dfe2027eaf9edcd42f461349000"),
    ]);
    let mut channel = open(card).unwrap();

    channel
        .transmit(
            &Command::new(0x80, 0xF2, 0x80, 0x02)
                .with_data(hex!("4F00").to_vec())
                .with_le(0x00),
        )
        .unwrap();
    channel
        .transmit(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
        .unwrap();
    channel
        .transmit(&Command::new(0x80, 0xE2, 0x90, 0x00).with_data(hex!("0102030405").to_vec()))
        .unwrap();

    let new_key = hex!("00112233445566778899AABBCCDDEEFF");
    let new_keys = StaticKeys::new(&new_key, &new_key, &new_key, 0x30).unwrap();
    let response = channel.put_key(0xFF, &new_keys).unwrap();
    assert_eq!(response.key_version_number, 0x30);
    assert_eq!(response.check_values, [hex!("3544e0"); 3]);

    let card = channel.close();
    assert_eq!(
        card.received[5].as_ref(),
        hex!(
            "84d8ff8158a4d55835795bce31ac7d74b1f050333e1843632a1bae50f84c0386"
            "f1f70e416c2d5018286a431ca6b63f4eaaeabb2f18b402832541c30a9e123be1"
            "81c28faa59e13bb14546d19a918bc7c98796dba7eba0d8b0c9ce33b1d300"
        )
    );
}

#[test]
fn test_put_key_replaces_current_keys() {
    let new_key = hex!("00112233445566778899AABBCCDDEEFF");
    let newer_key = [0xA5u8; 16];

    let mut second_response = vec![0x31];
    for _ in 0..3 {
        second_response.extend_from_slice(&key_check_value(&newer_key));
    }
    second_response.extend_from_slice(SUCCESS);

    // C-MAC only, so key components go over the wire as built
    let card = ScriptedCard::handshake(&[
        &hex!("303544e03544e03544e09000"),
        second_response.as_slice(),
    ]);
    let config = ChannelConfig::new().with_security_level(SecurityLevel::C_MAC);
    let mut channel = Scp03Channel::open_with_challenge(
        card,
        &StaticKeys::default_keys(),
        config,
        &HOST_CHALLENGE,
    )
    .unwrap();

    let new_keys = StaticKeys::new(&new_key, &new_key, &new_key, 0x30).unwrap();
    channel.put_key(0xFF, &new_keys).unwrap();

    let newer_keys = StaticKeys::new(&newer_key, &newer_key, &newer_key, 0x31).unwrap();
    let response = channel.put_key(0x30, &newer_keys).unwrap();
    assert_eq!(response.key_version_number, 0x31);

    // ENC component: header (5) || new version || 88 11 10 || encrypted key
    let card = channel.close();
    assert_eq!(
        card.received[2][9..25],
        KeyComponent::new(&new_key, &DEFAULT_KEY).encrypted_key
    );
    assert_eq!(
        card.received[3][9..25],
        KeyComponent::new(&newer_key, &new_key).encrypted_key
    );
}

#[test]
fn test_external_authenticate_rejected() {
    let card = ScriptedCard::new(&[INITIALIZE_UPDATE_RESPONSE, &hex!("6982")]);
    let err = open(card).unwrap_err();
    assert_eq!(err, Error::CardStatus(StatusWord::new(0x69, 0x82)));
    assert_eq!(err.kind(), ErrorKind::Card);
}

#[test]
fn test_wrong_keys() {
    let card = ScriptedCard::handshake(&[]);
    let keys = StaticKeys::new(&[0x11; 16], &[0x22; 16], &[0x33; 16], 0x01).unwrap();
    let err = Scp03Channel::open_with_challenge(
        card,
        &keys,
        ChannelConfig::default(),
        &HOST_CHALLENGE,
    )
    .unwrap_err();
    assert!(err.is_security_failure());
}

#[test]
fn test_tampered_response_mac() {
    let card = ScriptedCard::handshake(&[&hex!("0aa1b2599b3c81a99000")]);
    let mut channel = open(card).unwrap();

    // Counter 1, chain right after EXTERNAL AUTHENTICATE: the MAC cannot match
    let err = channel
        .transmit(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
        .unwrap_err();
    assert!(err.is_security_failure());
    assert_eq!(channel.session().state(), SessionState::Failed);

    let err = channel
        .transmit(&Command::new(0x80, 0xCA, 0x00, 0x66).with_le(0x00))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolOrder);
}

#[test]
fn test_transport_error() {
    let card = ScriptedCard::new(&[INITIALIZE_UPDATE_RESPONSE]);
    let err = open(card).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(err.kind(), ErrorKind::Transport);
}
