use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    program::{get_return_data, invoke},
    program_error::ProgramError,
};
use solana_program_test::*;
use solana_sdk::{
    clock::Clock,
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
    transaction::{Transaction, TransactionError},
};

use raffle_stack::{
    deploy::{self, FIRST_SUBSCRIPTION_ID, VRF_SUBSCRIPTION_FUND_AMOUNT},
    engine::UpkeepStatus,
    error::RaffleStackError,
    instruction::{self, RaffleStackInstruction},
    network_config::{network_config, CoordinatorAccounts, NetworkConfig},
    process_instruction,
    state::{RaffleStack, RaffleState},
    utils::word_from_u64,
    vrf_coordinator::{
        self,
        error::{CoordinatorError, COORDINATOR_ERROR_BASE},
        state::{derive_random_words, Coordinator},
    },
};

const PLAYER_FUNDS: u64 = 1_000_000_000;

// Returned by the keeper when the upkeep status differs from the expected one
const UPKEEP_MISMATCH: u32 = 0xEE;

// Keeper program: asks the raffle for its upkeep status over CPI and checks
// the decoded return data against the expected flag in `data[0]`
fn keeper_process_instruction(
    _program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();
    let raffle_program_info = next_account_info(account_info_iter)?;
    let raffle_info = next_account_info(account_info_iter)?;
    let expected = *data.first().ok_or(ProgramError::InvalidInstructionData)? == 1;

    let check = instruction::check_upkeep(raffle_program_info.key, Vec::new())?;
    invoke(&check, &[raffle_info.clone(), raffle_program_info.clone()])?;

    let (program_id, return_data) = get_return_data().ok_or(ProgramError::InvalidAccountData)?;
    if program_id != *raffle_program_info.key {
        return Err(ProgramError::IncorrectProgramId);
    }
    let status = UpkeepStatus::try_from_slice(&return_data)
        .map_err(|_| ProgramError::InvalidAccountData)?;
    if status.upkeep_needed != expected || !status.perform_data.is_empty() {
        return Err(ProgramError::Custom(UPKEEP_MISMATCH));
    }
    Ok(())
}

struct TestEnv {
    context: ProgramTestContext,
    raffle_program: Pubkey,
    keeper_program: Pubkey,
    coordinator: CoordinatorAccounts,
    raffle_stack: Pubkey,
    network: NetworkConfig,
}

// Start both programs and run the localnet deployment
async fn setup() -> TestEnv {
    let raffle_program = Pubkey::new_unique();
    let coordinator_program = Pubkey::new_unique();
    let keeper_program = Pubkey::new_unique();

    let mut program_test = ProgramTest::new(
        "raffle_stack",
        raffle_program,
        processor!(process_instruction),
    );
    program_test.add_program(
        "vrf_coordinator_mock",
        coordinator_program,
        processor!(vrf_coordinator::process_instruction),
    );
    program_test.add_program(
        "upkeep_keeper",
        keeper_program,
        processor!(keeper_process_instruction),
    );
    let mut context = program_test.start_with_context().await;

    let network = network_config("localnet").unwrap();
    let deployer = context.payer.pubkey();

    let mut instructions = deploy::deploy_mocks(&network, &coordinator_program, &deployer).unwrap();
    let deployment =
        deploy::deploy_raffle_stack(&network, &raffle_program, &coordinator_program, &deployer)
            .unwrap();
    let coordinator = deployment.coordinator;
    instructions.extend(deployment.instructions);
    process(&mut context, &instructions, &[]).await.unwrap();

    TestEnv {
        context,
        raffle_program,
        keeper_program,
        coordinator,
        raffle_stack: deployment.raffle_stack,
        network,
    }
}

async fn process(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let recent_blockhash = context
        .banks_client
        .get_new_latest_blockhash(&context.last_blockhash)
        .await
        .unwrap();
    context.last_blockhash = recent_blockhash;
    let mut transaction = Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    transaction.sign(&all_signers, recent_blockhash);
    context.banks_client.process_transaction(transaction).await
}

// Like `process`, but requires success and returns the program logs
async fn process_with_logs(
    context: &mut ProgramTestContext,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Vec<String> {
    let recent_blockhash = context
        .banks_client
        .get_new_latest_blockhash(&context.last_blockhash)
        .await
        .unwrap();
    context.last_blockhash = recent_blockhash;
    let mut transaction = Transaction::new_with_payer(instructions, Some(&context.payer.pubkey()));
    let mut all_signers = vec![&context.payer];
    all_signers.extend_from_slice(signers);
    transaction.sign(&all_signers, recent_blockhash);

    let outcome = context
        .banks_client
        .simulate_transaction(transaction.clone())
        .await
        .unwrap();
    assert_eq!(outcome.result, Some(Ok(())));
    context
        .banks_client
        .process_transaction(transaction)
        .await
        .unwrap();
    outcome.simulation_details.unwrap().logs
}

fn assert_logged(logs: &[String], line: &str) {
    let expected = format!("Program log: {}", line);
    assert!(
        logs.iter().any(|log| *log == expected),
        "missing log line {:?} in {:#?}",
        expected,
        logs
    );
}

fn custom_error(result: Result<(), BanksClientError>) -> u32 {
    match result {
        Err(BanksClientError::TransactionError(TransactionError::InstructionError(
            _,
            InstructionError::Custom(code),
        ))) => code,
        other => panic!("expected a custom program error, got {:?}", other),
    }
}

fn coordinator_error(error: CoordinatorError) -> u32 {
    COORDINATOR_ERROR_BASE + error as u32
}

impl TestEnv {
    async fn raffle(&mut self) -> RaffleStack {
        let account = self
            .context
            .banks_client
            .get_account(self.raffle_stack)
            .await
            .unwrap()
            .unwrap();
        RaffleStack::unpack(&account.data).unwrap()
    }

    async fn coordinator_state(&mut self) -> Coordinator {
        let account = self
            .context
            .banks_client
            .get_account(self.coordinator.coordinator)
            .await
            .unwrap()
            .unwrap();
        Coordinator::unpack(&account.data).unwrap()
    }

    async fn lamports(&mut self, address: Pubkey) -> u64 {
        self.context
            .banks_client
            .get_balance(address)
            .await
            .unwrap()
    }

    async fn now(&mut self) -> i64 {
        let clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp
    }

    async fn advance_clock(&mut self, seconds: i64) {
        let mut clock: Clock = self.context.banks_client.get_sysvar().await.unwrap();
        clock.unix_timestamp += seconds;
        self.context.set_sysvar(&clock);
    }

    async fn new_player(&mut self) -> Keypair {
        let player = Keypair::new();
        let fund = system_instruction::transfer(
            &self.context.payer.pubkey(),
            &player.pubkey(),
            PLAYER_FUNDS,
        );
        process(&mut self.context, &[fund], &[]).await.unwrap();
        player
    }

    async fn enter(&mut self, player: &Keypair, payment: u64) -> Result<(), BanksClientError> {
        let ix = instruction::enter_raffle(&self.raffle_program, &player.pubkey(), payment).unwrap();
        process(&mut self.context, &[ix], &[player]).await
    }

    /// Run the keeper, which fails unless the raffle reports `expected`
    async fn expect_upkeep(&mut self, expected: bool) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: self.keeper_program,
            accounts: vec![
                AccountMeta::new_readonly(self.raffle_program, false),
                AccountMeta::new_readonly(self.raffle_stack, false),
            ],
            data: vec![expected as u8],
        };
        process(&mut self.context, &[ix], &[]).await
    }

    async fn perform_upkeep(&mut self) -> Result<(), BanksClientError> {
        let ix = instruction::perform_upkeep(
            &self.raffle_program,
            &self.coordinator.program_id,
            &self.coordinator.coordinator,
            Vec::new(),
        )
        .unwrap();
        process(&mut self.context, &[ix], &[]).await
    }

    async fn fulfill(
        &mut self,
        request_id: u64,
        random_words: Option<Vec<[u8; 32]>>,
        winner: AccountMeta,
    ) -> Result<(), BanksClientError> {
        let ix = vrf_coordinator::instruction::fulfill_random_words(
            &self.coordinator.program_id,
            &self.raffle_program,
            &self.raffle_stack,
            request_id,
            random_words,
            &[winner],
        )
        .unwrap();
        process(&mut self.context, &[ix], &[]).await
    }

    /// Enter `count` fresh players and close the round
    async fn calculating_round(&mut self, count: usize) -> (Vec<Keypair>, u64) {
        let fee = self.network.entrance_fee;
        let mut players = Vec::new();
        for _ in 0..count {
            let player = self.new_player().await;
            self.enter(&player, fee).await.unwrap();
            players.push(player);
        }
        self.advance_clock(self.network.interval as i64 + 1).await;
        self.perform_upkeep().await.unwrap();
        let request_id = self.raffle().await.pending_request().unwrap();
        (players, request_id)
    }
}

#[tokio::test]
async fn test_deployment() {
    let mut env = setup().await;

    let raffle = env.raffle().await;
    assert_eq!(raffle.raffle_state(), RaffleState::Open);
    assert_eq!(raffle.entrance_fee(), env.network.entrance_fee);
    assert_eq!(raffle.interval(), env.network.interval);
    assert_eq!(raffle.number_of_players(), 0);
    assert_eq!(raffle.vrf.subscription_id, FIRST_SUBSCRIPTION_ID);
    assert_eq!(raffle.vrf.coordinator, env.coordinator.coordinator);
    assert_eq!(raffle.vrf.gas_lane, env.network.gas_lane);

    let coordinator = env.coordinator_state().await;
    let subscription = coordinator.subscription(FIRST_SUBSCRIPTION_ID).unwrap();
    assert_eq!(subscription.balance, VRF_SUBSCRIPTION_FUND_AMOUNT);
    assert_eq!(subscription.consumers, vec![env.raffle_stack]);
    assert_eq!(coordinator.base_fee, vrf_coordinator::BASE_FEE);
    assert_eq!(coordinator.gas_price_link, vrf_coordinator::GAS_PRICE_LINK);
}

#[tokio::test]
async fn test_initialize_twice_fails() {
    let mut env = setup().await;
    let deployer = env.context.payer.pubkey();

    let ix = instruction::initialize(
        &env.raffle_program,
        &deployer,
        &env.coordinator.program_id,
        &env.coordinator.coordinator,
        1,
        1,
        env.network.gas_lane,
        FIRST_SUBSCRIPTION_ID,
        env.network.callback_gas_limit,
    )
    .unwrap();
    let result = process(&mut env.context, &[ix], &[]).await;

    assert!(matches!(
        result,
        Err(BanksClientError::TransactionError(
            TransactionError::InstructionError(0, InstructionError::AccountAlreadyInitialized)
        ))
    ));
    assert_eq!(env.raffle().await.entrance_fee(), env.network.entrance_fee);
}

#[tokio::test]
async fn test_enter_rejects_insufficient_payment() {
    let mut env = setup().await;
    let player = env.new_player().await;
    let fee = env.network.entrance_fee;

    let result = env.enter(&player, fee - 1).await;

    assert_eq!(
        custom_error(result),
        RaffleStackError::InsufficientPayment as u32
    );
    assert_eq!(env.raffle().await.number_of_players(), 0);
    assert_eq!(env.lamports(player.pubkey()).await, PLAYER_FUNDS);
}

#[tokio::test]
async fn test_enter_records_player() {
    let mut env = setup().await;
    let player = env.new_player().await;
    let fee = env.network.entrance_fee;
    let vault_before = env.lamports(env.raffle_stack).await;

    env.enter(&player, fee).await.unwrap();

    let raffle = env.raffle().await;
    assert_eq!(raffle.number_of_players(), 1);
    assert_eq!(raffle.player(0), Some(&player.pubkey()));
    assert_eq!(raffle.balance, fee);
    assert_eq!(env.lamports(env.raffle_stack).await, vault_before + fee);
    assert_eq!(env.lamports(player.pubkey()).await, PLAYER_FUNDS - fee);
}

#[tokio::test]
async fn test_perform_upkeep_requires_players() {
    let mut env = setup().await;
    env.advance_clock(env.network.interval as i64 + 1).await;

    let result = env.perform_upkeep().await;

    assert_eq!(custom_error(result), RaffleStackError::UpkeepNotNeeded as u32);
    assert_eq!(env.raffle().await.raffle_state(), RaffleState::Open);
}

#[tokio::test]
async fn test_perform_upkeep_requires_interval() {
    let mut env = setup().await;
    let player = env.new_player().await;
    let fee = env.network.entrance_fee;
    env.enter(&player, fee).await.unwrap();

    let result = env.perform_upkeep().await;

    assert_eq!(custom_error(result), RaffleStackError::UpkeepNotNeeded as u32);
    assert_eq!(env.coordinator_state().await.requests.len(), 0);
}

#[tokio::test]
async fn test_perform_upkeep_requests_randomness() {
    let mut env = setup().await;
    let player = env.new_player().await;
    let fee = env.network.entrance_fee;
    env.enter(&player, fee).await.unwrap();
    env.advance_clock(env.network.interval as i64 + 1).await;

    let now = env.now().await;
    assert!(env.raffle().await.check_upkeep(now).upkeep_needed);
    env.expect_upkeep(true).await.unwrap();
    assert_eq!(custom_error(env.expect_upkeep(false).await), UPKEEP_MISMATCH);

    env.perform_upkeep().await.unwrap();
    env.expect_upkeep(false).await.unwrap();

    let raffle = env.raffle().await;
    assert_eq!(raffle.raffle_state(), RaffleState::Calculating);
    assert_eq!(raffle.pending_request(), Some(1));

    let coordinator = env.coordinator_state().await;
    let request = coordinator.request(1).unwrap();
    assert_eq!(request.consumer, env.raffle_stack);
    assert_eq!(request.consumer_program, env.raffle_program);
    assert_eq!(request.subscription_id, FIRST_SUBSCRIPTION_ID);
    assert_eq!(request.num_words, 1);

    // Round is closed
    let latecomer = env.new_player().await;
    let result = env.enter(&latecomer, fee).await;
    assert_eq!(custom_error(result), RaffleStackError::RaffleNotOpen as u32);

    let result = env.perform_upkeep().await;
    assert_eq!(custom_error(result), RaffleStackError::UpkeepNotNeeded as u32);
    assert_eq!(env.coordinator_state().await.requests.len(), 1);
}

#[tokio::test]
async fn test_check_upkeep_return_data() {
    let mut env = setup().await;
    let fee = env.network.entrance_fee;

    // No players yet
    env.expect_upkeep(false).await.unwrap();

    let player = env.new_player().await;
    env.enter(&player, fee).await.unwrap();
    env.expect_upkeep(false).await.unwrap();

    env.advance_clock(env.network.interval as i64).await;
    env.expect_upkeep(true).await.unwrap();
}

#[tokio::test]
async fn test_round_events_are_logged() {
    let mut env = setup().await;
    let fee = env.network.entrance_fee;
    let player = env.new_player().await;

    let enter = instruction::enter_raffle(&env.raffle_program, &player.pubkey(), fee).unwrap();
    let logs = process_with_logs(&mut env.context, &[enter], &[&player]).await;
    assert_logged(&logs, &format!("PlayerEntered: {}", player.pubkey()));

    env.advance_clock(env.network.interval as i64 + 1).await;
    let perform = instruction::perform_upkeep(
        &env.raffle_program,
        &env.coordinator.program_id,
        &env.coordinator.coordinator,
        Vec::new(),
    )
    .unwrap();
    let logs = process_with_logs(&mut env.context, &[perform], &[]).await;
    let request_id = env.raffle().await.pending_request().unwrap();
    assert_logged(&logs, &format!("RequestedRaffleWinner: {}", request_id));

    let fulfill = vrf_coordinator::instruction::fulfill_random_words(
        &env.coordinator.program_id,
        &env.raffle_program,
        &env.raffle_stack,
        request_id,
        Some(vec![word_from_u64(42)]),
        &[AccountMeta::new(player.pubkey(), false)],
    )
    .unwrap();
    let logs = process_with_logs(&mut env.context, &[fulfill], &[]).await;
    assert_logged(&logs, &format!("WinnerPicked: {}", player.pubkey()));
}

#[tokio::test]
async fn test_fulfill_nonexistent_request() {
    let mut env = setup().await;
    let player = env.new_player().await;

    let result = env
        .fulfill(1, None, AccountMeta::new(player.pubkey(), false))
        .await;

    assert_eq!(
        custom_error(result),
        coordinator_error(CoordinatorError::NonexistentRequest)
    );
}

#[tokio::test]
async fn test_fulfill_picks_winner_and_resets() {
    let mut env = setup().await;
    let fee = env.network.entrance_fee;
    let (players, request_id) = env.calculating_round(4).await;
    let winner = players[3].pubkey();
    let winner_before = env.lamports(winner).await;
    let vault_before = env.lamports(env.raffle_stack).await;
    let subscription_before = env
        .coordinator_state()
        .await
        .subscription(FIRST_SUBSCRIPTION_ID)
        .unwrap()
        .balance;

    // 7 mod 4 selects the last entrant
    env.fulfill(
        request_id,
        Some(vec![word_from_u64(7)]),
        AccountMeta::new(winner, false),
    )
    .await
    .unwrap();

    assert_eq!(env.lamports(winner).await, winner_before + 4 * fee);
    assert_eq!(env.lamports(env.raffle_stack).await, vault_before - 4 * fee);

    let now = env.now().await;
    let raffle = env.raffle().await;
    assert_eq!(raffle.raffle_state(), RaffleState::Open);
    assert_eq!(raffle.number_of_players(), 0);
    assert_eq!(raffle.balance, 0);
    assert_eq!(raffle.pending_request(), None);
    assert_eq!(raffle.recent_winner(), Some(&winner));
    assert_eq!(raffle.last_timestamp(), now);

    let coordinator = env.coordinator_state().await;
    assert!(coordinator.request(request_id).is_none());
    let expected_fee = vrf_coordinator::BASE_FEE
        + vrf_coordinator::GAS_PRICE_LINK * env.network.callback_gas_limit as u64;
    assert_eq!(
        coordinator.subscription(FIRST_SUBSCRIPTION_ID).unwrap().balance,
        subscription_before - expected_fee
    );

    // The answered request cannot be replayed
    let result = env
        .fulfill(request_id, None, AccountMeta::new(winner, false))
        .await;
    assert_eq!(
        custom_error(result),
        coordinator_error(CoordinatorError::NonexistentRequest)
    );
}

#[tokio::test]
async fn test_fulfill_with_derived_words() {
    let mut env = setup().await;
    let fee = env.network.entrance_fee;
    let (players, request_id) = env.calculating_round(2).await;

    let raffle = env.raffle().await;
    let winner = raffle
        .winner_for(&derive_random_words(request_id, 1))
        .unwrap();
    assert!(players.iter().any(|player| player.pubkey() == winner));
    let winner_before = env.lamports(winner).await;

    env.fulfill(request_id, None, AccountMeta::new(winner, false))
        .await
        .unwrap();

    assert_eq!(env.lamports(winner).await, winner_before + 2 * fee);
    assert_eq!(env.raffle().await.recent_winner(), Some(&winner));
}

#[tokio::test]
async fn test_rejected_payout_keeps_request_pending() {
    let mut env = setup().await;
    let fee = env.network.entrance_fee;
    let (players, request_id) = env.calculating_round(4).await;
    let winner = players[3].pubkey();
    let words = vec![word_from_u64(7)];

    let result = env
        .fulfill(
            request_id,
            Some(words.clone()),
            AccountMeta::new_readonly(winner, false),
        )
        .await;
    assert_eq!(custom_error(result), RaffleStackError::PayoutFailed as u32);

    let raffle = env.raffle().await;
    assert_eq!(raffle.raffle_state(), RaffleState::Calculating);
    assert_eq!(raffle.balance, 4 * fee);
    assert_eq!(raffle.pending_request(), Some(request_id));
    assert!(env.coordinator_state().await.request(request_id).is_some());

    let winner_before = env.lamports(winner).await;
    env.fulfill(request_id, Some(words), AccountMeta::new(winner, false))
        .await
        .unwrap();
    assert_eq!(env.lamports(winner).await, winner_before + 4 * fee);
    assert_eq!(env.raffle().await.raffle_state(), RaffleState::Open);
}

#[tokio::test]
async fn test_only_coordinator_can_fulfill() {
    let mut env = setup().await;
    let (players, request_id) = env.calculating_round(1).await;
    let impostor = Keypair::new();

    let data = RaffleStackInstruction::FulfillRandomWords {
        request_id,
        random_words: vec![word_from_u64(0)],
    }
    .pack()
    .unwrap();
    let ix = Instruction {
        program_id: env.raffle_program,
        accounts: vec![
            AccountMeta::new_readonly(impostor.pubkey(), true),
            AccountMeta::new(env.raffle_stack, false),
            AccountMeta::new(players[0].pubkey(), false),
        ],
        data,
    };
    let result = process(&mut env.context, &[ix], &[&impostor]).await;

    assert_eq!(
        custom_error(result),
        RaffleStackError::OnlyCoordinatorCanFulfill as u32
    );
    assert_eq!(env.raffle().await.raffle_state(), RaffleState::Calculating);
}

#[tokio::test]
async fn test_unregistered_consumer_cannot_request() {
    let mut env = setup().await;
    let outsider = Keypair::new();
    let request = env.raffle().await.vrf.randomness_request();

    let ix = vrf_coordinator::instruction::request_random_words(
        &env.coordinator.program_id,
        &env.coordinator.coordinator,
        &outsider.pubkey(),
        &request,
    )
    .unwrap();
    let result = process(&mut env.context, &[ix], &[&outsider]).await;

    assert_eq!(
        custom_error(result),
        coordinator_error(CoordinatorError::InvalidConsumer)
    );
}

#[tokio::test]
async fn test_unfunded_subscription_cannot_be_fulfilled() {
    let mut env = setup().await;
    let owner = env.context.payer.pubkey();
    let consumer = Keypair::new();
    let subscription_id = FIRST_SUBSCRIPTION_ID + 1;

    let setup_ixs = vec![
        vrf_coordinator::instruction::create_subscription(&env.coordinator.program_id, &owner)
            .unwrap(),
        vrf_coordinator::instruction::add_consumer(
            &env.coordinator.program_id,
            &owner,
            subscription_id,
            &consumer.pubkey(),
        )
        .unwrap(),
    ];
    process(&mut env.context, &setup_ixs, &[]).await.unwrap();

    let mut request = env.raffle().await.vrf.randomness_request();
    request.subscription_id = subscription_id;
    let ix = vrf_coordinator::instruction::request_random_words(
        &env.coordinator.program_id,
        &env.coordinator.coordinator,
        &consumer.pubkey(),
        &request,
    )
    .unwrap();
    process(&mut env.context, &[ix], &[&consumer]).await.unwrap();

    let pending = env.coordinator_state().await.requests[0].clone();
    let fulfill = vrf_coordinator::instruction::fulfill_random_words(
        &env.coordinator.program_id,
        &pending.consumer_program,
        &consumer.pubkey(),
        pending.request_id,
        None,
        &[],
    )
    .unwrap();
    let result = process(&mut env.context, &[fulfill], &[]).await;

    assert_eq!(
        custom_error(result),
        coordinator_error(CoordinatorError::InsufficientBalance)
    );
}
