use super::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn log_frame(what: &str, frame: &[u8]) {
    log::debug!("{what}: {}", hex::encode(frame));
}

fn short_addressing(dst: u16, src: u16) -> AddressingRepr {
    AddressingRepr {
        dst_pan_id: 0xabcd,
        dst_address: Address::short(dst),
        src_pan_id: 0xabcd,
        src_address: Address::short(src),
    }
}

#[test]
fn build_and_parse_beacon() {
    init();
    let mut beacon = BeaconRepr {
        superframe: SuperframeRepr {
            beacon_order: 6,
            superframe_order: 4,
            final_cap_slot: 15,
            pan_coordinator: true,
            association_permit: true,
            ..Default::default()
        },
        payload: &[0x01, 0x02, 0x03],
        ..Default::default()
    };
    beacon.add_pending(Address::short(0x0005)).unwrap();
    beacon
        .add_pending(Address::extended(0x0011_2233_4455_6677))
        .unwrap();

    let mut buffer = FrameBuffer::<127>::new(32);
    beacon
        .emit(buffer.reserve_back(beacon.buffer_len()).unwrap())
        .unwrap();

    let header = HeaderRepr {
        sequence_number: Some(9),
        ..HeaderRepr::new(
            FrameType::Beacon,
            AddressingRepr {
                src_pan_id: 0xabcd,
                src_address: Address::short(0x0000),
                ..Default::default()
            },
        )
    };
    header.emit(&mut buffer).unwrap();

    log_frame("built", buffer.as_slice());
    let frame = Frame::new(buffer.as_slice()).unwrap();
    assert_eq!(frame.frame_control().frame_type(), FrameType::Beacon);
    assert_eq!(frame.sequence_number(), Some(9));
    let addressing = frame.addressing().unwrap();
    assert_eq!(addressing.dst_address(), Address::Absent);
    assert_eq!(addressing.src_pan_id(), Some(0xabcd));

    let payload = BeaconPayload::new(frame.payload()).unwrap();
    assert_eq!(payload.superframe_specification().superframe_order(), 4);
    assert!(payload.is_pending(&[Address::extended(0x0011_2233_4455_6677)]));
    assert_eq!(payload.beacon_payload(), &[0x01, 0x02, 0x03]);
    assert_eq!(BeaconRepr::parse(&payload), beacon);
}

#[test]
fn build_and_parse_frame_with_ies() {
    init();
    let mut buffer = FrameBuffer::<127>::new(48);
    buffer.append(&[0xaa, 0xbb]).unwrap();

    let subs = [
        SubIeRequest {
            id: 0x1a,
            long: false,
            content: &[0x01, 0x02],
        },
        SubIeRequest {
            id: 0x09,
            long: true,
            content: &[0x03],
        },
    ];
    encode_payload_ies(&mut buffer, &[PayloadIeRequest::Mlme(&subs)], true).unwrap();
    encode_header_ies(
        &mut buffer,
        &[HeaderIeRequest {
            id: 0x1e,
            content: &[0x10, 0x20],
        }],
        true,
    )
    .unwrap();

    let header = HeaderRepr {
        frame_version: FrameVersion::Ieee802154_2020,
        ie_present: true,
        sequence_number: Some(3),
        ..HeaderRepr::new(FrameType::Data, short_addressing(0x0001, 0x0002))
    };
    header.emit(&mut buffer).unwrap();

    log_frame("built", buffer.as_slice());
    let frame = Frame::new(buffer.as_slice()).unwrap();
    assert_eq!(HeaderRepr::parse(&frame), header);

    let ies = frame.information_elements().unwrap();
    assert_eq!(ies.header.len(), 1);
    assert_eq!(
        ies.header_ie(0x1e).map(|ie| ie.element_id()),
        Some(HeaderElementId::TimeCorrection)
    );
    assert_eq!(ies.mlme_sub_ie(false, 0x1a), Some(&[0x01, 0x02][..]));
    assert_eq!(ies.mlme_sub_ie(true, 0x09), Some(&[0x03][..]));
    assert_eq!(ies.mlme_sub_ie(false, 0x1b), None);
    assert_eq!(frame.payload(), &[0xaa, 0xbb]);
}

#[test]
fn build_and_parse_command() {
    init();
    let command = CommandRepr::AssociationRequest { capability: 0x8e };
    let mut buffer = FrameBuffer::<127>::new(32);
    command
        .emit(buffer.reserve_back(command.buffer_len()).unwrap())
        .unwrap();

    let header = HeaderRepr {
        ack_request: true,
        sequence_number: Some(0x42),
        ..HeaderRepr::new(
            FrameType::MacCommand,
            AddressingRepr {
                dst_pan_id: 0xabcd,
                dst_address: Address::short(0x0000),
                src_pan_id: 0xffff,
                src_address: Address::extended(0x0102_0304_0506_0708),
            },
        )
    };
    header.emit(&mut buffer).unwrap();

    log_frame("built", buffer.as_slice());
    let frame = Frame::new(buffer.as_slice()).unwrap();
    assert!(frame.frame_control().ack_request());
    assert!(!frame.frame_control().pan_id_compression());
    let addressing = frame.addressing().unwrap();
    assert_eq!(addressing.src_pan_id(), Some(0xffff));

    let cmd = MacCommand::new(frame.payload()).unwrap();
    assert_eq!(cmd.command_id(), CommandId::AssociationRequest);
    assert_eq!(CommandRepr::parse(&cmd), Some(command));
}

#[test]
fn frame_with_fcs() {
    init();
    let mut buffer = FrameBuffer::<127>::new(32);
    buffer.append(&[0x01, 0x02]).unwrap();
    let header = HeaderRepr {
        sequence_number: Some(1),
        ..HeaderRepr::new(FrameType::Data, short_addressing(0xffff, 0x0002))
    };
    header.emit(&mut buffer).unwrap();
    let fcs = calculate_fcs(buffer.as_slice());
    buffer.append(&fcs.to_le_bytes()).unwrap();

    log_frame("with fcs", buffer.as_slice());
    let with_fcs = FrameWithFcs::new(buffer.as_slice()).unwrap();
    let frame = with_fcs.frame().unwrap();
    assert_eq!(frame.payload(), &[0x01, 0x02]);

    let mut corrupted = std::vec::Vec::from(buffer.as_slice());
    corrupted[3] ^= 0x01;
    assert!(FrameWithFcs::new(&corrupted[..]).is_err());
}

#[test]
fn secured_frame_layout() {
    init();
    let mut buffer = FrameBuffer::<127>::new(48);
    buffer.append(&[0x00; 4]).unwrap();
    buffer.reserve_back(SecurityLevel::EncMic32.mic_len()).unwrap();

    let header = HeaderRepr {
        frame_version: FrameVersion::Ieee802154_2006,
        sequence_number: Some(1),
        security: Some(AuxSecurityHeaderRepr {
            security_level: SecurityLevel::EncMic32,
            key_id_mode: KeyIdMode::Source4,
            frame_counter: 0x0100,
            key_source: [1, 2, 3, 4, 0, 0, 0, 0],
            key_index: 7,
        }),
        ..HeaderRepr::new(FrameType::Data, short_addressing(0x0001, 0x0002))
    };
    header.emit(&mut buffer).unwrap();
    assert_eq!(header.buffer_len(), 2 + 1 + 6 + 10);

    log_frame("built", buffer.as_slice());
    let frame = Frame::new(buffer.as_slice()).unwrap();
    assert_eq!(frame.header_len(), header.buffer_len());
    let aux = frame.auxiliary_security_header().unwrap();
    assert_eq!(aux.frame_counter(), Some(0x0100));
    assert_eq!(aux.key_source(), &[1, 2, 3, 4]);
    assert_eq!(aux.key_index(), Some(7));
    assert_eq!(frame.payload().len(), 8);
}
