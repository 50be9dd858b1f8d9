//! Recycles byte buffers between worker threads and prints how well the pool performed.

use std::sync::Arc;
use std::thread;

use free_pool::FreePool;

const WORKERS: usize = 8;
const MESSAGES_PER_WORKER: usize = 10_000;

fn main() {
    let pool = Arc::new(FreePool::with_capacity(|| Vec::<u8>::with_capacity(16 * 1024), 512));

    let workers = (0..WORKERS)
        .map(|worker_index| {
            let pool = Arc::clone(&pool);

            thread::spawn(move || {
                let mut total_len = 0;

                for message_index in 0..MESSAGES_PER_WORKER {
                    let mut buffer = pool.get();
                    buffer.extend_from_slice(
                        format!("worker {worker_index} message {message_index}").as_bytes(),
                    );
                    total_len += buffer.len();

                    buffer.clear();
                    pool.put(buffer);
                }

                total_len
            })
        })
        .collect::<Vec<_>>();

    let total_len: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    println!("Processed {total_len} bytes of messages");
    println!(
        "{} buffers cached across {} shards",
        pool.approx_len(),
        pool.shard_count()
    );

    let report = nm::Report::collect();
    println!("{report}");
}
