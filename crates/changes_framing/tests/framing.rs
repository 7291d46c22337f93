use bytes::Bytes;
use changes_framing::{FramedLine, FramedLines, FramingLimits, LineFramer};
use futures::{stream, StreamExt};

const FEED: &[u8] = b"{\"seq\":1,\"id\":\"a\"}\n\n{\"seq\":2,\"id\":\"b\"}\r\n\n\n{\"seq\":3,\"id\":\"c\"}\n";

fn expected_lines() -> Vec<Vec<u8>> {
    FEED.split(|b| *b == b'\n')
        .map(<[u8]>::to_vec)
        .take(FEED.iter().filter(|b| **b == b'\n').count())
        .collect()
}

fn frame_in_chunks(chunk_size: usize) -> Vec<FramedLine> {
    let mut framer = LineFramer::new(FramingLimits::default());
    for chunk in FEED.chunks(chunk_size) {
        framer.push(chunk);
    }
    framer.finish();
    std::iter::from_fn(|| framer.next_line()).collect()
}

#[test]
fn output_is_independent_of_chunk_boundaries() {
    let expected = expected_lines();
    for chunk_size in 1..=FEED.len() {
        let lines = frame_in_chunks(chunk_size);
        let bytes: Vec<Vec<u8>> = lines
            .into_iter()
            .map(|line| match line {
                FramedLine::Line { bytes, .. } => bytes,
                other => panic!("unexpected {other:?} at chunk size {chunk_size}"),
            })
            .collect();
        assert_eq!(bytes, expected, "chunk size {chunk_size}");
    }
}

#[test]
fn framed_lines_never_contain_the_delimiter() {
    for chunk_size in 1..=FEED.len() {
        for line in frame_in_chunks(chunk_size) {
            if let FramedLine::Line { bytes, .. } = line {
                assert!(!bytes.contains(&b'\n'));
            }
        }
    }
}

#[test]
fn empty_lines_are_produced_for_keep_alives() {
    let empties = frame_in_chunks(7)
        .into_iter()
        .filter(|line| matches!(line, FramedLine::Line { bytes, .. } if bytes.is_empty()))
        .count();
    assert_eq!(empties, 3);
}

#[tokio::test]
async fn stream_adapter_numbers_lines_in_order() {
    let chunks: Vec<Result<Bytes, std::io::Error>> = FEED
        .chunks(5)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    let lines: Vec<_> = FramedLines::new(stream::iter(chunks), FramingLimits::default())
        .collect()
        .await;

    let numbers: Vec<usize> = lines
        .iter()
        .map(|line| match line {
            Ok(FramedLine::Line { line_number, .. }) => *line_number,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
}
