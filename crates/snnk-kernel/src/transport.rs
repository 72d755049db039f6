//! The inter-process transport (spec.md §1 external collaborator)
//!
//! The kernel calls a single opaque all-to-all primitive with fixed
//! per-rank chunk sizes; it never touches sockets, MPI, or any other
//! wire-level detail itself. [`LoopbackTransport`] is the trivial one-rank
//! case; [`InProcessTransport`] is a deterministic multi-rank test double
//! that lets the gather protocol be exercised without a real cluster.

use std::sync::{Arc, Barrier, Mutex};

/// An all-to-all exchange of fixed-size chunked buffers: `send[r*cs..(r+1)*cs)`
/// is this rank's outgoing data for rank `r`; after `exchange` returns,
/// `recv[r*cs..(r+1)*cs)` holds what rank `r` sent to this rank.
pub trait Transport<T: Copy> {
    /// Perform one all-to-all round. `send` and `recv` both have length
    /// `num_ranks * chunk_size`.
    fn exchange(&self, send: &[T], recv: &mut [T]);
}

/// The single-rank case: rank 0's chunk for itself is both what it sent and
/// what it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackTransport;

impl<T: Copy> Transport<T> for LoopbackTransport {
    fn exchange(&self, send: &[T], recv: &mut [T]) {
        recv.copy_from_slice(send);
    }
}

/// A deterministic multi-rank transport for testing: all simulated ranks
/// live in the current process and rendezvous through a shared mailbox and
/// barrier. One instance is built per rank via [`InProcessTransport::cluster`].
pub struct InProcessTransport<T> {
    rank: usize,
    num_ranks: usize,
    chunk_size: usize,
    mailbox: Arc<Mutex<Vec<Vec<T>>>>,
    barrier: Arc<Barrier>,
}

impl<T: Copy + Default + Send + 'static> InProcessTransport<T> {
    /// Build `num_ranks` transports sharing one mailbox, one per simulated
    /// rank, to be handed to that rank's `EventDeliveryManager`.
    pub fn cluster(num_ranks: usize, chunk_size: usize) -> Vec<Self> {
        let mailbox = Arc::new(Mutex::new(vec![
            vec![T::default(); num_ranks * chunk_size];
            num_ranks
        ]));
        let barrier = Arc::new(Barrier::new(num_ranks));
        (0..num_ranks)
            .map(|rank| Self {
                rank,
                num_ranks,
                chunk_size,
                mailbox: mailbox.clone(),
                barrier: barrier.clone(),
            })
            .collect()
    }
}

impl<T: Copy + Default> Transport<T> for InProcessTransport<T> {
    fn exchange(&self, send: &[T], recv: &mut [T]) {
        {
            let mut mailbox = self.mailbox.lock().expect("mailbox mutex poisoned");
            mailbox[self.rank] = send.to_vec();
        }
        self.barrier.wait();
        {
            let mailbox = self.mailbox.lock().expect("mailbox mutex poisoned");
            for other in 0..self.num_ranks {
                let their_send = &mailbox[other];
                let their_chunk_for_me =
                    &their_send[self.rank * self.chunk_size..(self.rank + 1) * self.chunk_size];
                recv[other * self.chunk_size..(other + 1) * self.chunk_size]
                    .copy_from_slice(their_chunk_for_me);
            }
        }
        self.barrier.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_echoes_send_into_recv() {
        let transport = LoopbackTransport;
        let send = [1u32, 2, 3, 4];
        let mut recv = [0u32; 4];
        transport.exchange(&send, &mut recv);
        assert_eq!(recv, send);
    }

    #[test]
    fn in_process_transport_delivers_each_ranks_chunk() {
        let transports = InProcessTransport::<u32>::cluster(2, 2);
        let mut handles = Vec::new();
        for (rank, transport) in transports.into_iter().enumerate() {
            handles.push(std::thread::spawn(move || {
                // rank 0 sends {10,11} to rank0-chunk and {20,21} to rank1-chunk.
                let send: Vec<u32> = if rank == 0 {
                    vec![10, 11, 20, 21]
                } else {
                    vec![30, 31, 40, 41]
                };
                let mut recv = vec![0u32; 4];
                transport.exchange(&send, &mut recv);
                recv
            }));
        }
        let results: Vec<Vec<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        // rank 0's recv chunk 0 is rank0's chunk-for-rank0 = {10,11};
        // rank 0's recv chunk 1 is rank1's chunk-for-rank0 = {30,31}.
        assert_eq!(results[0], vec![10, 11, 30, 31]);
        assert_eq!(results[1], vec![20, 21, 40, 41]);
    }
}
