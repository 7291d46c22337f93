use std::{
    pin::Pin,
    task::{ready, Context, Poll},
};

use bytes::Bytes;
use futures::{Stream, StreamExt};

use super::framer::{FramedLine, LineFramer};
use crate::config::FramingLimits;

/// Adapts a stream of body chunks into a stream of framed lines.
///
/// A chunk error is yielded once and ends the stream; any partially
/// assembled line is dropped with it.
pub struct FramedLines<S> {
    inner: S,
    framer: LineFramer,
    done: bool,
}

impl<S> FramedLines<S> {
    pub fn new(inner: S, limits: FramingLimits) -> Self {
        Self {
            inner,
            framer: LineFramer::new(limits),
            done: false,
        }
    }

    pub fn framer(&self) -> &LineFramer {
        &self.framer
    }
}

impl<S, E> Stream for FramedLines<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<FramedLine, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(line) = this.framer.next_line() {
                return Poll::Ready(Some(Ok(line)));
            }
            if this.done {
                return Poll::Ready(None);
            }

            match ready!(this.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => this.framer.push(&chunk),
                Some(Err(err)) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.done = true;
                    this.framer.finish();
                }
            }
        }
    }
}
