use crate::{CVBytes, Hasher, OUT_LEN};
use blake3::{derive_key, hash, keyed_hash};

const TEST_KEY: CVBytes = *b"whats the Elvish word for friend";

// Paints a buffer with a repeating 0..=250 byte pattern, matching the official BLAKE3 test
// vectors (a cycle length of 251, the largest prime below 256, to avoid accidental symmetry).
fn test_input(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// Interesting input lengths: spans block/chunk boundaries on both sides.
const TEST_CASES: &[usize] = &[
    0,
    1,
    63,
    64,
    65,
    1023,
    1024,
    1025,
    2 * 1024 - 1,
    2 * 1024,
    2 * 1024 + 1,
    3 * 1024 + 1,
    31 * 1024,
    100 * 1024 + 7,
];

#[test]
fn matches_upstream_unkeyed() {
    for &case in TEST_CASES {
        let input = test_input(case);
        let mut hasher = Hasher::new();
        hasher.update(&input);
        let mut out = [0u8; OUT_LEN];
        hasher.finalize(&mut out);
        assert_eq!(hash(&input).as_bytes(), &out, "len={case}");
    }
}

#[test]
fn matches_upstream_keyed() {
    for &case in TEST_CASES {
        let input = test_input(case);
        let mut hasher = Hasher::new_keyed(&TEST_KEY);
        hasher.update(&input);
        let mut out = [0u8; OUT_LEN];
        hasher.finalize(&mut out);
        assert_eq!(keyed_hash(&TEST_KEY, &input).as_bytes(), &out, "len={case}");
    }
}

#[test]
fn matches_upstream_derive_key() {
    let context = "BLAKE3 2019-12-27 16:13:59 example context (not the test vector one)";
    for &case in TEST_CASES {
        let input = test_input(case);
        let mut hasher = Hasher::new_derive_key(context);
        hasher.update(&input);
        let mut out = [0u8; OUT_LEN];
        hasher.finalize(&mut out);
        assert_eq!(derive_key(context, &input), out, "len={case}");
    }
}

#[test]
fn known_answer_vectors() {
    // From the spec's table of known answers (first 32 bytes of output).
    let cases: &[(usize, &str)] = &[
        (
            0,
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262",
        ),
        (
            1,
            "2d3adedff11b61f14c886e35afa036736dcd87a74d27b5c1510225d0f592e213",
        ),
        (
            1024,
            "42214739f095a406f3fc83deb889744ac00df831c10daa55189b5d121c855af7",
        ),
        (
            1025,
            "d00278ae47eb27b34faecf67b4fe263f82d5412916c1ffd97c8cb7fb814b8444",
        ),
    ];
    for &(len, expected_hex) in cases {
        let input = test_input(len);
        let mut hasher = Hasher::new();
        hasher.update(&input);
        let mut out = [0u8; OUT_LEN];
        hasher.finalize(&mut out);
        assert_eq!(hex::encode(out), expected_hex, "len={len}");
    }
}

#[test]
fn known_answer_keyed() {
    let input = test_input(1024);
    let mut hasher = Hasher::new_keyed(&TEST_KEY);
    hasher.update(&input);
    let mut out = [0u8; OUT_LEN];
    hasher.finalize(&mut out);
    assert_eq!(
        hex::encode(out),
        "8f68f6bc151e70f4ff091ca4e392b4ff5b8ef8f5c0391baa1c0af17c7adec7c7"
    );
}

#[test]
fn known_answer_derive_key() {
    let context = "BLAKE3 2019-12-27 16:29:52 test vectors context";
    let mut hasher = Hasher::new_derive_key(context);
    let mut out = [0u8; OUT_LEN];
    hasher.finalize(&mut out);
    assert_eq!(
        hex::encode(out),
        "2cc39783c223154fea8dfb7c1b1660f2ac2dcbd1c1de8277b0b0dd39b7e50d7d"
    );
}

// Update associativity: any way of splitting the same bytes across update() calls must produce
// the same output.
#[test]
fn update_associativity() {
    let input = test_input(2049);
    let mut whole = Hasher::new();
    whole.update(&input);
    let mut whole_out = [0u8; OUT_LEN];
    whole.finalize(&mut whole_out);

    for chunk_size in [1, 100, 1024, 1025, 2049] {
        let mut hasher = Hasher::new();
        for piece in input.chunks(chunk_size) {
            hasher.update(piece);
        }
        let mut out = [0u8; OUT_LEN];
        hasher.finalize(&mut out);
        assert_eq!(out, whole_out, "chunk_size={chunk_size}");
    }
}

// Prefix property: a shorter finalize() output is a prefix of a longer one.
#[test]
fn finalize_prefix_property() {
    let input = test_input(5000);
    let mut hasher = Hasher::new();
    hasher.update(&input);

    let mut long = [0u8; 200];
    hasher.finalize(&mut long);
    for len in [0, 1, 31, 32, 33, 64, 65, 199, 200] {
        let mut short = vec![0u8; len];
        hasher.finalize(&mut short);
        assert_eq!(short, &long[..len], "len={len}");
    }
}

// XOF seekability: finalize_seek(s, buf) must equal bytes [s, s+buf.len()) of an (effectively)
// infinite finalize() stream.
#[test]
fn finalize_seek_matches_stream() {
    let mut hasher = Hasher::new();
    hasher.update(b"abc");

    let mut reference = [0u8; 96];
    hasher.finalize(&mut reference);

    let mut seeked = [0u8; 32];
    hasher.finalize_seek(64, &mut seeked);
    assert_eq!(seeked, reference[64..96]);
}

#[test]
fn finalize_seek_across_multiple_output_blocks() {
    let input = test_input(10_000);
    let mut hasher = Hasher::new();
    hasher.update(&input);

    let mut reference = [0u8; 300];
    hasher.finalize(&mut reference);

    for seek in [0u64, 1, 63, 64, 65, 127, 128, 200, 268] {
        let len = (300 - seek as usize).min(32);
        let mut out = vec![0u8; len];
        hasher.finalize_seek(seek, &mut out);
        assert_eq!(
            out,
            &reference[seek as usize..seek as usize + len],
            "seek={seek}"
        );
    }
}

// Idempotence: finalize() can be called repeatedly without disturbing the hasher, and further
// update() calls continue to extend the original input.
#[test]
fn finalize_is_idempotent() {
    let mut hasher = Hasher::new();
    hasher.update(b"hello ");

    let mut first = [0u8; OUT_LEN];
    hasher.finalize(&mut first);
    let mut second = [0u8; OUT_LEN];
    hasher.finalize(&mut second);
    assert_eq!(first, second);

    hasher.update(b"world");
    let mut extended = [0u8; OUT_LEN];
    hasher.finalize(&mut extended);

    let mut one_shot = Hasher::new();
    one_shot.update(b"hello world");
    let mut one_shot_out = [0u8; OUT_LEN];
    one_shot.finalize(&mut one_shot_out);
    assert_eq!(extended, one_shot_out);
}

// popcount(chunk_counter) must equal cv_stack_len after every push-with-merge; we can't see the
// private field directly, so we check the externally observable consequence: feeding N chunks
// worth of input one at a time must merge down to a single root byte-for-byte identical to
// feeding them all at once, for every N around a range of power-of-two boundaries.
#[test]
fn stack_merges_match_bulk_hash_around_power_of_two_boundaries() {
    for num_chunks in 1..=40usize {
        let input = test_input(num_chunks * 1024 + 37);
        let mut incremental = Hasher::new();
        for chunk in input.chunks(1024) {
            incremental.update(chunk);
        }
        let mut incremental_out = [0u8; OUT_LEN];
        incremental.finalize(&mut incremental_out);

        let mut bulk = Hasher::new();
        bulk.update(&input);
        let mut bulk_out = [0u8; OUT_LEN];
        bulk.finalize(&mut bulk_out);

        assert_eq!(incremental_out, bulk_out, "num_chunks={num_chunks}");
        assert_eq!(hash(&input).as_bytes(), &incremental_out, "num_chunks={num_chunks}");
    }
}

#[test]
fn reset_restores_initial_state() {
    let input = test_input(5000);
    let mut hasher = Hasher::new_keyed(&TEST_KEY);
    hasher.update(b"garbage that should be forgotten");
    hasher.reset();
    hasher.update(&input);
    let mut out = [0u8; OUT_LEN];
    hasher.finalize(&mut out);
    assert_eq!(keyed_hash(&TEST_KEY, &input).as_bytes(), &out);
}

#[test]
fn clone_forks_independent_hash_state() {
    let mut hasher = Hasher::new();
    hasher.update(b"shared prefix ");

    let mut forked = hasher.clone();
    hasher.update(b"branch A");
    forked.update(b"branch B");

    let mut out_a = [0u8; OUT_LEN];
    hasher.finalize(&mut out_a);
    let mut out_b = [0u8; OUT_LEN];
    forked.finalize(&mut out_b);
    assert_ne!(out_a, out_b);
    assert_eq!(hash(b"shared prefix branch A").as_bytes(), &out_a);
    assert_eq!(hash(b"shared prefix branch B").as_bytes(), &out_b);
}
