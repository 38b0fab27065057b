//! Latest-wins pacing for frame streams.

use futures::Stream;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep, sleep};

/// Extension trait to add pacing to any Stream.
pub trait PaceExt: Stream {
    /// Emit at most one item per `period`.
    ///
    /// Items arriving faster than the period are collapsed: only the
    /// newest survives to the next emission. A display consuming frames
    /// at 20Hz from a 60Hz source sees every third frame, always the
    /// freshest one.
    fn pace(self, period: Duration) -> Pace<Self>
    where
        Self: Sized,
    {
        Pace::new(self, period)
    }
}

impl<T: Stream> PaceExt for T {}

pin_project! {
    /// A stream combinator that spaces out emissions, keeping only the
    /// newest pending item.
    pub struct Pace<S: Stream> {
        #[pin]
        stream: S,
        #[pin]
        deadline: Sleep,
        period: Duration,
        newest: Option<S::Item>,
        exhausted: bool,
    }
}

impl<S: Stream> Pace<S> {
    /// Create a new paced stream. The first item is delivered without
    /// delay; the period applies between deliveries.
    pub fn new(stream: S, period: Duration) -> Self {
        Self {
            stream,
            deadline: sleep(Duration::ZERO),
            period,
            newest: None,
            exhausted: false,
        }
    }
}

impl<S: Stream> Stream for Pace<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain whatever the inner stream has ready, keeping the newest.
        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.newest = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.newest.is_some() {
            match this.deadline.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    this.deadline.reset(Instant::now() + *this.period);
                    return Poll::Ready(this.newest.take());
                }
                Poll::Pending => {}
            }
        } else if *this.exhausted {
            return Poll::Ready(None);
        }

        // Waker registered with either the inner stream or the timer.
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::StreamExt;
    use tokio_stream::wrappers::ReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn slow_items_pass_through() {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let mut paced = Box::pin(ReceiverStream::new(rx).pace(Duration::from_millis(10)));

        tx.send(1u32).await.unwrap();
        assert_eq!(paced.next().await, Some(1));
        tokio::time::advance(Duration::from_millis(20)).await;
        tx.send(2).await.unwrap();
        assert_eq!(paced.next().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_to_the_newest_item() {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let mut paced = Box::pin(ReceiverStream::new(rx).pace(Duration::from_millis(10)));

        for i in 1u32..=5 {
            tx.send(i).await.unwrap();
        }
        // First delivery is immediate and sees the newest of the burst.
        assert_eq!(paced.next().await, Some(5));

        for i in 6u32..=9 {
            tx.send(i).await.unwrap();
        }
        drop(tx);
        // Second delivery waits out the period, then takes the newest.
        assert_eq!(paced.next().await, Some(9));
        assert_eq!(paced.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_stream_propagates() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u32>(1);
        let mut paced = Box::pin(ReceiverStream::new(rx).pace(Duration::from_millis(10)));
        drop(tx);
        assert_eq!(paced.next().await, None);
    }
}
