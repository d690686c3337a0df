//! Streaming behaviour of the pipeline stages under concurrent producers and
//! consumers

use std::thread;

use recursive_pir::crypto::{CryptoParams, MockCrypto, MockParams};
use recursive_pir::db::DbGenerator;
use recursive_pir::params::{PirParameters, RlweParams};
use recursive_pir::pir::{QueryGenerator, ReplyExtraction, ReplyGenerator};
use recursive_pir::{PirError, RlweCrypto};

fn mock_setup() -> (PirParameters, MockCrypto, DbGenerator) {
    let mock = MockParams::new(8, 16);
    let params =
        PirParameters::new(CryptoParams::Mock(mock.clone()), 60, 100, 2, vec![3, 2, 5]).unwrap();
    (params, MockCrypto::new(mock).unwrap(), DbGenerator::new(60, 100, 21))
}

fn server_with_query<'a>(
    params: &PirParameters,
    crypto: &'a MockCrypto,
    db: &'a DbGenerator,
    index: u64,
    capacity: usize,
) -> ReplyGenerator<'a, MockCrypto, DbGenerator> {
    let client = QueryGenerator::new(params, crypto).unwrap();
    client.generate_query(index).unwrap();
    let server = ReplyGenerator::new(params, crypto, db)
        .unwrap()
        .with_queue_capacity(capacity);
    while let Some(bytes) = client.pop_query() {
        server.push_query(&bytes).unwrap();
    }
    server
}

#[test]
fn test_interleaved_pops_match_pops_after_generation() {
    let (params, crypto, db) = mock_setup();
    let index = 47;
    let expected = params.expected_reply_count();
    assert!(expected > 4);

    let sequential = server_with_query(&params, &crypto, &db, index, expected as usize);
    let imported = sequential.import_data(0, 100).unwrap();
    sequential.generate_reply(&imported).unwrap();
    let after: Vec<Vec<u8>> = std::iter::from_fn(|| sequential.pop_reply()).collect();

    let concurrent = server_with_query(&params, &crypto, &db, index, 2);
    let interleaved = thread::scope(|s| {
        let producer = s.spawn(|| concurrent.generate_reply(&imported));
        let mut seen = Vec::new();
        while let Some(bytes) = concurrent.pop_reply() {
            assert!(concurrent.nb_replies_generated() >= seen.len() as u64);
            seen.push(bytes);
        }
        producer.join().unwrap().unwrap();
        seen
    });

    assert_eq!(after.len() as u64, expected);
    assert_eq!(interleaved, after);
    assert_eq!(concurrent.nb_replies_generated(), expected);
}

#[test]
fn test_threaded_pipeline_with_small_queues() {
    let params = RlweParams::new(256, 80);
    let crypto = RlweCrypto::with_seed(params.clone(), 99).unwrap();
    let params = PirParameters::new(CryptoParams::Rlwe(params), 40, 700, 1, vec![5, 8]).unwrap();
    let db = DbGenerator::new(40, 700, 5);
    let index = 29;

    let client = QueryGenerator::new(&params, &crypto)
        .unwrap()
        .with_queue_capacity(3);
    let server = ReplyGenerator::new(&params, &crypto, &db)
        .unwrap()
        .with_queue_capacity(3);
    let extraction = ReplyExtraction::new(&params, &crypto)
        .unwrap()
        .with_queue_capacity(3);
    let imported = server.import_data(0, 700).unwrap();

    let retrieved = thread::scope(|s| {
        s.spawn(|| client.generate_query(index).unwrap());
        s.spawn(|| {
            while let Some(bytes) = client.pop_query() {
                server.push_query(&bytes).unwrap();
            }
            server.generate_reply(&imported).unwrap();
        });
        s.spawn(|| {
            while let Some(bytes) = server.pop_reply() {
                extraction.push_encrypted_reply(&bytes).unwrap();
            }
            extraction.finish_encrypted_replies();
        });
        s.spawn(|| extraction.extract_reply(700).unwrap());

        let mut retrieved = Vec::new();
        while let Some(chunk) = extraction.pop_plaintext_result() {
            retrieved.extend_from_slice(&chunk);
        }
        retrieved
    });

    // 700 bytes span two plaintexts, each nested in 8 reply elements
    assert_eq!(server.nb_replies_generated(), 16);
    assert_eq!(retrieved, db.element(index).unwrap());
}

#[test]
fn test_truncated_reply_stream_is_desynchronized() {
    let (params, crypto, db) = mock_setup();
    let server = server_with_query(&params, &crypto, &db, 3, 256);
    let imported = server.import_data(0, 100).unwrap();
    server.generate_reply(&imported).unwrap();

    let extraction = ReplyExtraction::new(&params, &crypto).unwrap();
    let mut replies: Vec<Vec<u8>> = std::iter::from_fn(|| server.pop_reply()).collect();
    replies.pop();
    for bytes in &replies {
        extraction.push_encrypted_reply(bytes).unwrap();
    }
    extraction.finish_encrypted_replies();

    let err = extraction.extract_reply(200).unwrap_err();
    assert!(matches!(
        err,
        PirError::Desynchronized { received, expected }
            if received == expected - 1 && expected == params.expected_reply_count()
    ));
}

#[test]
fn test_aborted_extraction_unblocks_reply_producer() {
    let (params, crypto, db) = mock_setup();
    let server = server_with_query(&params, &crypto, &db, 3, 1);
    let imported = server.import_data(0, 100).unwrap();
    let extraction = ReplyExtraction::new(&params, &crypto)
        .unwrap()
        .with_queue_capacity(1);

    let (producer, transport) = thread::scope(|s| {
        let producer = s.spawn(|| server.generate_reply(&imported));
        let transport = s.spawn(|| {
            while let Some(bytes) = server.pop_reply() {
                if let Err(e) = extraction.push_encrypted_reply(&bytes) {
                    server.finish();
                    return Err(e);
                }
            }
            Ok(())
        });

        // the client gives up without ever extracting
        extraction.finish_encrypted_replies();
        (producer.join().unwrap(), transport.join().unwrap())
    });

    assert!(matches!(transport, Err(PirError::StreamClosed(_))));
    assert!(matches!(producer, Err(PirError::StreamClosed(_))));
    assert!(server.nb_replies_generated() < params.expected_reply_count());
}

#[test]
fn test_query_out_of_range_finishes_stream() {
    let (params, crypto, _) = mock_setup();
    let client = QueryGenerator::new(&params, &crypto).unwrap();
    let err = client.generate_query(60).unwrap_err();
    assert!(matches!(
        err,
        PirError::IndexOutOfRange {
            index: 60,
            num_elements: 60
        }
    ));
    assert!(client.pop_query().is_none());
}
