use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rusty_pool::{Builder, ThreadPool};
use sheet_dice_roll::{
    limits::{check_resolved, DiceLimits},
    parse, resolve_labeled_with, DiceInput, DiceResult, Placeholders, ResolvedDice,
};
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{spawn, spawn_blocking, JoinHandle},
    time::{interval_at, Instant},
};

use crate::{config::RollerConfig, error::RollError, request::RollRequest};

#[derive(Debug)]
enum RngProviderOps {
    GetRng(oneshot::Sender<Xoshiro256PlusPlus>),
    SetCryptoRng(ChaCha20Rng),
}

/// Owns the master generator. Every roll gets its own generator seeded from
/// it, so concurrent rolls never share a draw sequence.
struct RngProvider {
    rng: ChaCha20Rng,
    receiver: mpsc::Receiver<RngProviderOps>,
}

impl RngProvider {
    async fn run(&mut self) {
        while let Some(op) = self.receiver.recv().await {
            match op {
                RngProviderOps::GetRng(channel) => {
                    let mut seed: <Xoshiro256PlusPlus as SeedableRng>::Seed = Default::default();
                    self.rng.fill(&mut seed);
                    if channel.send(Xoshiro256PlusPlus::from_seed(seed)).is_err() {
                        log::debug!("rng requester went away");
                    }
                }
                RngProviderOps::SetCryptoRng(rng) => self.rng = rng,
            }
        }
    }
}

async fn wait_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow() {
            break;
        }
        if stop.changed().await.is_err() {
            break;
        }
    }
}

fn start_rng_provider(
    rng_reseed: Duration,
    mut stop: watch::Receiver<bool>,
) -> (JoinHandle<()>, mpsc::Sender<RngProviderOps>) {
    let (sender, receiver) = mpsc::channel(32);
    let rng_handle = spawn(async move {
        RngProvider {
            rng: ChaCha20Rng::from_entropy(),
            receiver,
        }
        .run()
        .await
    });
    let reseed_sender = sender.clone();
    (
        spawn(async move {
            let mut interval = interval_at(Instant::now() + rng_reseed, rng_reseed);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if reseed_sender
                            .send(RngProviderOps::SetCryptoRng(ChaCha20Rng::from_entropy()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                        log::debug!("reseeded roll rng");
                    }
                    _ = wait_stop(&mut stop) => {
                        break;
                    }
                }
            }
            drop(reseed_sender);
            log::info!("stopped reseeding task");
            if let Err(e) = rng_handle.await {
                log::error!("rng provider failed: {}", e);
            }
        }),
        sender,
    )
}

/// Resolves roll requests on a pool of worker threads.
///
/// Must be created inside a tokio runtime.
pub struct RollExecutor {
    pool: ThreadPool,
    rng_gen: mpsc::Sender<RngProviderOps>,
    placeholders: Placeholders,
    stop: watch::Sender<bool>,
    reseed_handle: JoinHandle<()>,
}

impl RollExecutor {
    pub fn new(size: u32, rng_reseed: Duration, placeholders: Placeholders) -> RollExecutor {
        let (stop, stop_listener) = watch::channel(false);
        let (reseed_handle, rng_gen) = start_rng_provider(rng_reseed, stop_listener);
        RollExecutor {
            pool: Builder::new()
                .core_size(1)
                .max_size(size.max(1))
                .name("Roll Worker".to_string())
                .build(),
            rng_gen,
            placeholders,
            stop,
            reseed_handle,
        }
    }

    pub fn from_config(config: &RollerConfig) -> RollExecutor {
        RollExecutor::new(
            config.rng_workers,
            config.rng_reseed,
            config.placeholders.clone(),
        )
    }

    /// Turns the request into dice without drawing anything. Text is parsed
    /// with the configured placeholders plus the request's bonus damage;
    /// structured dice are only bounds checked.
    fn prepare(&self, request: RollRequest) -> Result<Vec<ResolvedDice>, RollError> {
        match request.dices {
            DiceInput::Text(expression) => {
                let mut placeholders = self.placeholders.clone();
                placeholders.merge(&Placeholders::with_bonus_damage(request.bonus_damage));
                Ok(parse(&expression, &placeholders)?
                    .into_iter()
                    .map(ResolvedDice::from)
                    .collect())
            }
            DiceInput::Resolved(dice) => {
                check_resolved(&dice)
                    .map_err(|(index, kind)| RollError::InvalidDice { index, kind })?;
                Ok(dice)
            }
        }
    }

    async fn rng(&self) -> Result<Xoshiro256PlusPlus, RollError> {
        let (rng_send, rng_receive) = oneshot::channel();
        self.rng_gen
            .send(RngProviderOps::GetRng(rng_send))
            .await
            .map_err(|_| RollError::RngUnavailable)?;
        rng_receive.await.map_err(|_| RollError::RngUnavailable)
    }

    pub async fn roll(&self, request: RollRequest) -> Result<DiceResult, RollError> {
        let dice = self.prepare(request)?;
        if dice.is_empty() {
            return Ok(DiceResult::nothing());
        }
        log::debug!(
            "rolling {} terms, range {}..={}",
            dice.len(),
            DiceLimits::min(&dice[..]),
            DiceLimits::max(&dice[..])
        );
        let mut rng = self.rng().await?;
        let (result_sender, result_receiver) = oneshot::channel();
        self.pool.execute(move || {
            if result_sender
                .send(resolve_labeled_with(&dice, &mut rng))
                .is_err()
            {
                log::debug!("roll caller went away before the result was ready");
            }
        });
        result_receiver.await.map_err(|_| RollError::WorkerLost)
    }

    /// Stops reseeding and waits for queued rolls to finish.
    pub async fn shutdown(self) {
        let RollExecutor {
            pool,
            rng_gen,
            stop,
            reseed_handle,
            ..
        } = self;
        if stop.send(true).is_err() {
            log::debug!("reseeding task already gone");
        }
        drop(rng_gen);
        if let Err(e) = reseed_handle.await {
            log::error!("reseeding task failed: {}", e);
        }
        if let Err(e) = spawn_blocking(move || pool.shutdown_join()).await {
            log::error!("roll workers failed to stop: {}", e);
        }
        log::info!("roll executor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_dice_roll::{DiceToken, ParseErrorKind};
    use std::sync::Arc;

    fn executor() -> RollExecutor {
        RollExecutor::new(2, Duration::from_secs(300), Placeholders::new())
    }

    #[tokio::test]
    async fn test_text_roll() {
        let executor = executor();
        let result = executor.roll(RollRequest::text("2d6+3")).await.unwrap();
        assert!((5..=15).contains(&result.roll));
        assert_eq!(result.rolls.len(), 2);
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_bonus_damage_overrides_config() {
        let mut placeholders = Placeholders::with_bonus_damage(Some("100"));
        placeholders.insert("STR", "10").unwrap();
        let executor = RollExecutor::new(1, Duration::from_secs(300), placeholders);
        let configured = executor.roll(RollRequest::text("DB+STR")).await.unwrap();
        assert_eq!(configured.roll, 110);
        let overridden = executor
            .roll(RollRequest::text("DB+STR").with_bonus_damage(Some("1")))
            .await
            .unwrap();
        assert_eq!(overridden.roll, 11);
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_and_invalid_input() {
        let executor = executor();
        assert_eq!(
            executor.roll(RollRequest::text("  ")).await,
            Ok(DiceResult::nothing())
        );
        assert_eq!(
            executor.roll(RollRequest::resolved(Vec::new())).await,
            Ok(DiceResult::nothing())
        );
        match executor.roll(RollRequest::text("2dX")).await {
            Err(RollError::Parse(e)) => assert_eq!(e.kind, ParseErrorKind::InvalidFaces),
            other => panic!("unexpected result {:?}", other),
        }
        let oversized = RollRequest::resolved(vec![
            DiceToken::dice(1, 6).into(),
            DiceToken::dice(500, 6).into(),
        ]);
        assert_eq!(
            executor.roll(oversized).await,
            Err(RollError::InvalidDice {
                index: 1,
                kind: ParseErrorKind::InvalidCount
            })
        );
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_blank_bonus_damage_is_nothing() {
        let executor = executor();
        let request = RollRequest::text(" DB ").with_bonus_damage(Some(""));
        assert_eq!(executor.roll(request).await, Ok(DiceResult::nothing()));
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_result_within_limits() {
        let executor = executor();
        let dice: Vec<ResolvedDice> = vec![
            DiceToken::dice(4, 6).keep(sheet_dice_roll::Selector::Higher, 3).into(),
            DiceToken::dice(1, 4).negated().into(),
            DiceToken::constant(2).into(),
        ];
        let (low, high) = (DiceLimits::min(&dice[..]), DiceLimits::max(&dice[..]));
        assert_eq!((low, high), (1, 19));
        for _ in 0..20 {
            let result = executor.roll(RollRequest::resolved(dice.clone())).await.unwrap();
            assert!((low..=high).contains(&result.roll));
        }
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn test_labels_survive() {
        let executor = executor();
        let request = RollRequest::resolved(vec![ResolvedDice::labeled(
            DiceToken::dice(1, 4),
            "Dano Bônus",
        )]);
        let result = executor.roll(request).await.unwrap();
        assert_eq!(result.rolls[0].label.as_deref(), Some("Dano Bônus"));
        executor.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_rolls() {
        let executor = Arc::new(executor());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let executor = executor.clone();
                tokio::spawn(async move { executor.roll(RollRequest::text("10d20")).await })
            })
            .collect();
        let mut totals = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.rolls[0].dice.len(), 10);
            assert!((10..=200).contains(&result.roll));
            totals.push(result.rolls[0].dice.clone());
        }
        totals.sort_by_key(|dice| dice.iter().map(|d| d.value).collect::<Vec<_>>());
        totals.dedup();
        assert!(totals.len() > 1);
        if let Ok(executor) = Arc::try_unwrap(executor) {
            executor.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_reseed_keeps_serving() {
        let executor = RollExecutor::new(1, Duration::from_millis(5), Placeholders::new());
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(6)).await;
            let result = executor.roll(RollRequest::text("d6")).await.unwrap();
            assert!((1..=6).contains(&result.roll));
        }
        executor.shutdown().await;
    }
}
