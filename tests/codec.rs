use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use m4db_analysis::codec::{
    decode_from_path, dir_to_uid, dir_to_uid_under, encode_to_path, split_path, uid_to_dir,
};
use m4db_analysis::error::M4dbError;

const UID: &str = "0f86b938-15a3-4f1e-99b1-8f2b65b37a03";
const PAIRS: [&str; 16] = [
    "0f", "86", "b9", "38", "15", "a3", "4f", "1e", "99", "b1", "8f", "2b", "65", "b3", "7a", "03",
];

#[test]
fn encodes_known_uid() {
    assert_eq!(encode_to_path(UID).unwrap(), PAIRS);
}

#[test]
fn decodes_known_pairs() {
    assert_eq!(decode_from_path(PAIRS).unwrap(), UID);
}

#[test]
fn round_trips_preserve_case() {
    let uids = [
        UID,
        "00000000-0000-0000-0000-000000000000",
        "FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF",
        "6C1D2E3F-4a5b-6c7d-8e9f-A0B1C2D3E4F5",
    ];
    for uid in uids {
        let segments = encode_to_path(uid).unwrap();
        assert_eq!(decode_from_path(&segments).unwrap(), uid);
    }

    let pairs = [
        "Aa", "bB", "00", "ff", "10", "9C", "d4", "e5", "01", "23", "45", "67", "89", "AB", "cd",
        "EF",
    ];
    let uid = decode_from_path(pairs).unwrap();
    assert_eq!(encode_to_path(&uid).unwrap(), pairs);
}

#[test]
fn rejects_malformed_uids() {
    let bad = [
        "0f86b938-15a3-4f1e-99b1",
        "0f86b93815a34f1e99b18f2b65b37a03",
        "0f86b938-15a3-4f1e-99b1-8f2b65b37a0g",
        "0f86b938-15a3-4f1e-99b1-8f2b65b37a031",
        "0f86b93-815a3-4f1e-99b1-8f2b65b37a03",
        "",
    ];
    for uid in bad {
        assert_matches!(encode_to_path(uid), Err(M4dbError::InvalidUidFormat(value)) if value == uid);
    }
}

#[test]
fn rejects_wrong_segment_counts() {
    assert_matches!(
        decode_from_path(&PAIRS[..15]),
        Err(M4dbError::InvalidSegmentCount(15))
    );

    let mut seventeen = PAIRS.to_vec();
    seventeen.push("00");
    assert_matches!(
        decode_from_path(&seventeen),
        Err(M4dbError::InvalidSegmentCount(17))
    );
}

#[test]
fn names_the_bad_pair() {
    let mut pairs = PAIRS;
    pairs[5] = "zz";
    assert_matches!(
        decode_from_path(pairs),
        Err(M4dbError::InvalidHexPair(pair)) if pair == "zz"
    );

    pairs[5] = "abc";
    assert_matches!(
        decode_from_path(pairs),
        Err(M4dbError::InvalidHexPair(pair)) if pair == "abc"
    );
}

#[test]
fn directory_round_trip() {
    let dir = uid_to_dir(UID).unwrap();
    assert_eq!(dir, Utf8PathBuf::from(PAIRS.join("/")));
    assert_eq!(split_path(&dir), PAIRS);
    assert_eq!(dir_to_uid(&dir).unwrap(), UID);
}

#[test]
fn archive_dir_under_source_root() {
    let root = Utf8Path::new("/exports/model");
    let dir = root.join(uid_to_dir(UID).unwrap());
    assert_eq!(dir_to_uid_under(root, &dir).unwrap(), UID);
    assert_matches!(dir_to_uid(&dir), Err(M4dbError::InvalidSegmentCount(19)));
}
