//! Per-room battle orchestration
//!
//! [`BattleController`] owns both teams, applies decoded fragments in arrival
//! order, issues reference lookups, and once per turn waits for reference
//! data to converge before asking the [`DecisionEngine`] for an action.

use std::sync::Arc;

use serde::Deserialize;
use tactician_protocol::{
    BattleEvent, ClientCommand, ClientMessage, Fragment, Player, PokemonRef, ReferenceRecord,
    RoomFragment, ServerFrame, TeamRequest, classify_frame, parse_fragment,
    parse_reference_data, parse_team_request, parse_turn_update, to_id,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::decision::{Action, Decision, DecisionEngine, DecisionReason, EngineConfig, TurnContext};
use crate::error::BattleError;
use crate::sync::{LookupKind, Resolved, SyncPolicy, Synchronizer, is_team_synchronized};
use crate::types::{Pokemon, Team, TypeChart};

/// Outbound side of the server connection
pub trait CommandSink {
    fn send(&self, message: ClientMessage) -> anyhow::Result<()>;
}

impl CommandSink for mpsc::UnboundedSender<ClientMessage> {
    fn send(&self, message: ClientMessage) -> anyhow::Result<()> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| anyhow::anyhow!("Client disconnected"))
    }
}

/// Settings for one battle room
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControllerConfig {
    pub room_id: String,
    #[serde(default)]
    pub sync: SyncPolicy,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ControllerConfig {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            sync: SyncPolicy::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// How a battle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `winner` is `None` when the username matches neither recorded player
    Win {
        username: String,
        winner: Option<Player>,
    },
    Tie,
}

impl Outcome {
    pub fn winner(&self) -> Option<Player> {
        match self {
            Outcome::Win { winner, .. } => *winner,
            Outcome::Tie => None,
        }
    }

    pub fn loser(&self) -> Option<Player> {
        self.winner().map(|p| p.opponent())
    }
}

/// Tracks one battle room and plays it
pub struct BattleController<S> {
    room_id: String,
    sink: S,

    /// Teams indexed by player (p1, p2)
    sides: [Team; 2],
    /// Which player we are, once a request says so
    perspective: Option<Player>,
    usernames: [Option<String>; 2],

    sync: Synchronizer,
    engine: DecisionEngine,
    latest_request: Option<TeamRequest>,

    turn: u32,
    outcome: Option<Outcome>,
}

fn index(player: Player) -> usize {
    match player {
        Player::P1 => 0,
        Player::P2 => 1,
    }
}

impl<S: CommandSink> BattleController<S> {
    /// Start tracking a newly joined battle room
    pub fn on_room_init(config: ControllerConfig, chart: Arc<TypeChart>, sink: S) -> Self {
        tracing::info!(room = %config.room_id, "Tracking battle room");
        Self {
            room_id: config.room_id,
            sink,
            sides: [Team::new(Some(Player::P1)), Team::new(Some(Player::P2))],
            perspective: None,
            usernames: [None, None],
            sync: Synchronizer::new(config.sync),
            engine: DecisionEngine::new(config.engine, chart),
            latest_request: None,
            turn: 0,
            outcome: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn perspective(&self) -> Option<Player> {
        self.perspective
    }

    pub fn side(&self, player: Player) -> &Team {
        &self.sides[index(player)]
    }

    /// Our team (p1 until a request reveals our side)
    pub fn own_team(&self) -> &Team {
        self.side(self.perspective.unwrap_or(Player::P1))
    }

    pub fn opponent_team(&self) -> &Team {
        self.side(self.perspective.unwrap_or(Player::P1).opponent())
    }

    pub fn username(&self, player: Player) -> Option<&str> {
        self.usernames[index(player)].as_deref()
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn latest_request(&self) -> Option<&TeamRequest> {
        self.latest_request.as_ref()
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_ended(&self) -> bool {
        self.outcome.is_some()
    }

    /// Which player a username belongs to, by recorded `|player|` names
    pub fn player_named(&self, username: &str) -> Option<Player> {
        let id = to_id(username);
        [Player::P1, Player::P2]
            .into_iter()
            .find(|p| self.username(*p).is_some_and(|name| to_id(name) == id))
    }

    /// Whether every revealed pokemon on both sides has its species and
    /// moves resolved
    pub fn is_synchronized(&self) -> bool {
        let registry = self.sync.registry();
        self.sides.iter().all(|team| is_team_synchronized(team, registry))
    }

    // === Inbound ===

    /// Apply every fragment of a frame addressed to this room
    pub fn on_frame(&mut self, frame: &ServerFrame) -> Result<(), BattleError> {
        if frame.room_id.as_deref() != Some(self.room_id.as_str()) {
            return Ok(());
        }
        for fragment in classify_frame(frame) {
            self.on_fragment(&fragment)?;
        }
        Ok(())
    }

    /// Decode and apply one fragment. Fragments that do not parse are logged
    /// and dropped; only a failed send is returned as an error.
    pub fn on_fragment(&mut self, fragment: &RoomFragment) -> Result<(), BattleError> {
        match parse_fragment(fragment) {
            Ok(Fragment::TeamRequest(request)) => self.apply_request(request),
            Ok(Fragment::TurnUpdate(events)) => self.apply_events(&events),
            Ok(Fragment::ReferenceData(record)) => {
                self.apply_reference(&record);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(room = %self.room_id, error = %e, raw = ?e.raw(), "Dropping fragment");
                Ok(())
            }
        }
    }

    /// A `|request|` payload arrived
    pub fn on_team_revealed(&mut self, raw: &str) -> Result<(), BattleError> {
        match parse_team_request(raw) {
            Ok(request) => self.apply_request(request),
            Err(e) => {
                tracing::warn!(room = %self.room_id, error = %e, "Dropping team request");
                Ok(())
            }
        }
    }

    /// A block of battle lines arrived
    pub fn on_turn_update(&mut self, block: &str) -> Result<(), BattleError> {
        match parse_turn_update(block) {
            Ok(events) => self.apply_events(&events),
            Err(e) => {
                tracing::warn!(room = %self.room_id, error = %e, "Dropping turn update");
                Ok(())
            }
        }
    }

    /// A `/data` answer arrived
    pub fn on_reference_data(&mut self, raw: &str) {
        match parse_reference_data(raw) {
            Ok(record) => self.apply_reference(&record),
            Err(e) => tracing::warn!(room = %self.room_id, error = %e, "Dropping reference data"),
        }
    }

    fn apply_request(&mut self, request: TeamRequest) -> Result<(), BattleError> {
        let player = request.player;
        self.perspective = Some(player);
        self.usernames[index(player)] = Some(request.username.clone());

        let team = &mut self.sides[index(player)];
        for entry in &request.pokemon {
            match team.find_mut(&entry.name) {
                Some(pokemon) => pokemon.update_from_request(entry),
                None => {
                    if team.reveal(Pokemon::from_request(entry)).is_none() {
                        tracing::warn!(pokemon = %entry.name, "Roster full, ignoring request entry");
                    }
                }
            }
        }

        tracing::debug!(
            room = %self.room_id,
            rqid = ?request.rqid,
            force_switch = request.force_switch,
            "Applied team request"
        );
        self.latest_request = Some(request);
        self.request_missing(player)
    }

    /// Apply turn events in order. Events about unknown pokemon are skipped.
    pub fn apply_events(&mut self, events: &[BattleEvent]) -> Result<(), BattleError> {
        for event in events {
            match self.apply_event(event) {
                Ok(()) => {}
                Err(e @ BattleError::UnknownEntity { .. }) => {
                    tracing::debug!(room = %self.room_id, error = %e, "Ignoring event");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn apply_event(&mut self, event: &BattleEvent) -> Result<(), BattleError> {
        match event {
            BattleEvent::Player { player, username } => {
                if !username.is_empty() {
                    self.usernames[index(*player)] = Some(username.clone());
                }
            }
            BattleEvent::Switch {
                pokemon,
                details,
                hp_status,
                ..
            } => {
                let team = &mut self.sides[index(pokemon.player)];
                let Some(entry) = team.find_or_reveal(&pokemon.name, details) else {
                    return Err(unknown(pokemon));
                };
                entry.apply_hp(hp_status);
                team.set_active(&pokemon.name);
                self.request_missing(pokemon.player)?;
            }
            BattleEvent::Damage { pokemon, hp_status } | BattleEvent::Heal { pokemon, hp_status } => {
                self.pokemon_mut(pokemon)?.apply_hp(hp_status);
            }
            BattleEvent::Boost {
                pokemon,
                stat,
                amount,
            } => {
                self.sides[index(pokemon.player)].buffs.raise(*stat, *amount);
            }
            BattleEvent::Unboost {
                pokemon,
                stat,
                amount,
            } => {
                self.sides[index(pokemon.player)].buffs.lower(*stat, *amount);
            }
            BattleEvent::Faint(pokemon) => {
                if !self.sides[index(pokemon.player)].faint(&pokemon.name) {
                    return Err(unknown(pokemon));
                }
            }
            BattleEvent::Move {
                pokemon, move_name, ..
            } => {
                // Our own moves are already known from the request
                if Some(pokemon.player) != self.perspective {
                    self.pokemon_mut(pokemon)?.record_move(move_name);
                    self.request_missing(pokemon.player)?;
                }
            }
            BattleEvent::Turn(turn) => {
                self.turn = *turn;
                tracing::debug!(room = %self.room_id, turn = *turn, "Turn started");
            }
            BattleEvent::Win(username) => {
                let winner = self.player_named(username);
                if winner.is_none() {
                    tracing::warn!(room = %self.room_id, username = %username, "Winner matches no player");
                }
                tracing::info!(room = %self.room_id, winner = %username, side = ?winner, "Battle ended");
                self.outcome = Some(Outcome::Win {
                    username: username.clone(),
                    winner,
                });
            }
            BattleEvent::Tie => {
                tracing::info!(room = %self.room_id, "Battle ended in a tie");
                self.outcome = Some(Outcome::Tie);
            }
        }
        Ok(())
    }

    fn pokemon_mut(&mut self, pokemon: &PokemonRef) -> Result<&mut Pokemon, BattleError> {
        self.sides[index(pokemon.player)]
            .find_mut(&pokemon.name)
            .ok_or_else(|| unknown(pokemon))
    }

    /// Merge a lookup answer into the registry and both teams
    pub fn apply_reference(&mut self, record: &ReferenceRecord) {
        match self.sync.mark_resolved(record) {
            Resolved::Move(data) => {
                tracing::debug!(room = %self.room_id, id = %data.id, "Resolved move");
            }
            Resolved::Species(data) => {
                let mut updated = 0;
                for player in [Player::P1, Player::P2] {
                    let derive = self.perspective != Some(player);
                    updated += self.sides[index(player)].apply_species(&data, derive);
                }
                tracing::debug!(room = %self.room_id, id = %data.id, updated = updated, "Resolved species");
            }
        }
    }

    /// Attach known species data and look up everything still unknown for
    /// one side
    fn request_missing(&mut self, player: Player) -> Result<(), BattleError> {
        let derive = self.perspective != Some(player);
        let registry = self.sync.registry();
        let team = &mut self.sides[index(player)];

        let mut names = Vec::new();
        for pokemon in team.members_mut() {
            if !pokemon.is_species_resolved() {
                match registry.get_species(&pokemon.species_id()) {
                    Some(data) => pokemon.resolve_species(Arc::clone(data), derive),
                    None => names.push((LookupKind::Species, pokemon.species.clone())),
                }
            }
            for slot in &pokemon.moves {
                if !registry.has_move(&slot.id) {
                    names.push((LookupKind::Move, slot.id.clone()));
                }
            }
        }

        for (kind, name) in names {
            if let Some(command) = self.sync.request_if_unknown(kind, &name) {
                self.send(command)?;
            }
        }
        Ok(())
    }

    // === Outbound ===

    fn send(&self, command: ClientCommand) -> Result<(), BattleError> {
        tracing::debug!(room = %self.room_id, command = command.name(), "Sending command");
        self.sink
            .send(ClientMessage::in_room(self.room_id.clone(), command))
            .map_err(BattleError::Send)
    }

    pub fn forfeit(&self) -> Result<(), BattleError> {
        self.send(ClientCommand::Forfeit)
    }

    pub fn save_replay(&self) -> Result<(), BattleError> {
        self.send(ClientCommand::SaveReplay)
    }

    pub fn set_timer(&self, on: bool) -> Result<(), BattleError> {
        self.send(ClientCommand::Timer(on))
    }

    // === Decisions ===

    fn turn_context(&self) -> TurnContext {
        self.latest_request
            .as_ref()
            .map(|r| TurnContext {
                force_switch: r.force_switch,
                trapped: r.trapped,
            })
            .unwrap_or_default()
    }

    /// Wait for reference data, choose an action and submit it.
    ///
    /// Fragments arriving on `inbound` while waiting are applied as usual. If
    /// the data does not converge within the sync timeout, a fallback action
    /// is submitted and reported with [`DecisionReason::SyncTimeout`].
    pub async fn decide_and_act(
        &mut self,
        inbound: &mut mpsc::Receiver<RoomFragment>,
    ) -> Result<Decision, BattleError> {
        let synced = self.wait_for_sync(inbound).await;
        // A request may have arrived during the wait
        let context = self.turn_context();

        let decision = match synced {
            Ok(()) => {
                let registry = self.sync.registry();
                match self
                    .engine
                    .decide(registry, self.own_team(), self.opponent_team(), context)
                {
                    Err(BattleError::UnresolvedReference { name }) => {
                        tracing::error!(room = %self.room_id, name = %name, "Decision needed unresolved data");
                        self.fallback_decision(DecisionReason::Fallback, context)?
                    }
                    result => result?,
                }
            }
            Err(BattleError::SyncTimeout { pending }) => {
                tracing::warn!(
                    room = %self.room_id,
                    pending = ?pending,
                    "Reference data did not converge, using fallback"
                );
                self.fallback_decision(DecisionReason::SyncTimeout, context)?
            }
            Err(e) => return Err(e),
        };

        let command = self.command_for(&decision)?;
        tracing::info!(
            room = %self.room_id,
            turn = self.turn,
            action = %decision.action,
            reason = ?decision.reason,
            damage = ?decision.estimate.as_ref().map(|e| e.damage),
            threat = ?decision.estimate.as_ref().map(|e| e.threat),
            "Submitting decision"
        );
        self.send(command)?;

        Ok(decision)
    }

    fn fallback_decision(&self, reason: DecisionReason, context: TurnContext) -> Result<Decision, BattleError> {
        let action = self.engine.fallback(self.own_team(), context)?;
        Ok(Decision {
            action,
            reason,
            estimate: None,
        })
    }

    fn command_for(&self, decision: &Decision) -> Result<ClientCommand, BattleError> {
        let rqid = self.latest_request.as_ref().and_then(|r| r.rqid);
        match &decision.action {
            Action::UseMove { slot, .. } => Ok(ClientCommand::ChooseMove { slot: *slot, rqid }),
            Action::SwitchTo { name } => {
                // Switch slots index the latest request's roster
                let slot = self
                    .latest_request
                    .as_ref()
                    .and_then(|r| r.pokemon.iter().position(|p| p.name == *name))
                    .map(|i| i + 1)
                    .ok_or_else(|| BattleError::UnknownEntity {
                        side: self.perspective.unwrap_or(Player::P1),
                        name: name.clone(),
                    })?;
                Ok(ClientCommand::Switch { slot, rqid })
            }
        }
    }

    /// Poll until both teams are synchronized, applying inbound fragments
    /// meanwhile and resending lookups when progress stalls
    pub async fn wait_for_sync(
        &mut self,
        inbound: &mut mpsc::Receiver<RoomFragment>,
    ) -> Result<(), BattleError> {
        let policy = self.sync.policy().clone();
        let deadline = tokio::time::sleep_until(Instant::now() + policy.timeout);
        tokio::pin!(deadline);

        let mut ticker = tokio::time::interval(policy.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.sync.begin_wait();
        let mut inbound_open = true;

        loop {
            if self.is_synchronized() {
                return Ok(());
            }

            tokio::select! {
                _ = &mut deadline => {
                    return Err(BattleError::SyncTimeout {
                        pending: self.sync.pending(),
                    });
                }
                fragment = inbound.recv(), if inbound_open => match fragment {
                    Some(fragment) => self.on_fragment(&fragment)?,
                    None => inbound_open = false,
                },
                _ = ticker.tick() => {
                    for command in self.sync.poll() {
                        self.send(command)?;
                    }
                }
            }
        }
    }
}

fn unknown(pokemon: &PokemonRef) -> BattleError {
    BattleError::UnknownEntity {
        side: pokemon.player,
        name: pokemon.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use tactician_protocol::{FragmentKind, parse_server_frame};

    const ROOM: &str = "battle-gen7randombattle-1";

    const REQUEST: &str = r#"{"active":[{"moves":[{"move":"Flamethrower","id":"flamethrower","pp":24,"maxpp":24,"target":"normal","disabled":false},{"move":"Air Slash","id":"airslash","pp":24,"maxpp":24,"target":"any","disabled":false}]}],"side":{"name":"Tactician","id":"p1","pokemon":[{"ident":"p1: Charizard","details":"Charizard, L82, M","condition":"250/250","active":true,"stats":{"atk":180,"def":176,"spa":228,"spd":185,"spe":210},"moves":["flamethrower","airslash"],"baseAbility":"blaze","item":"heavydutyboots"},{"ident":"p1: Blastoise","details":"Blastoise, L84, M","condition":"270/270","active":false,"stats":{"atk":170,"def":220,"spa":180,"spd":225,"spe":165},"moves":["surf","icebeam"],"baseAbility":"torrent","item":"leftovers"}]},"rqid":2}"#;

    const FORCE_SWITCH: &str = r#"{"forceSwitch":[true],"side":{"name":"Tactician","id":"p1","pokemon":[{"ident":"p1: Charizard","details":"Charizard, L82, M","condition":"0 fnt","active":true,"stats":{"atk":180,"def":176,"spa":228,"spd":185,"spe":210},"moves":["flamethrower","airslash"],"baseAbility":"blaze","item":"heavydutyboots"},{"ident":"p1: Blastoise","details":"Blastoise, L84, M","condition":"270/270","active":false,"stats":{"atk":170,"def":220,"spa":180,"spd":225,"spe":165},"moves":["surf","icebeam"],"baseAbility":"torrent","item":"leftovers"}]},"rqid":5}"#;

    const START: &str = "|init|battle\n\
|player|p1|Tactician|1|\n\
|player|p2|Rival|2|\n\
|switch|p1a: Charizard|Charizard, L82, M|250/250\n\
|switch|p2a: Venusaur|Venusaur, L84, F|100/100\n\
|turn|1";

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<ClientMessage>>>);

    impl RecordingSink {
        fn sent(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|m| m.to_wire_format()).collect()
        }

        fn lookups(&self) -> usize {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|m| matches!(m.command, ClientCommand::Data(_)))
                .count()
        }
    }

    impl CommandSink for RecordingSink {
        fn send(&self, message: ClientMessage) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn controller() -> (BattleController<RecordingSink>, RecordingSink) {
        init_tracing();
        let sink = RecordingSink::default();
        let controller = BattleController::on_room_init(
            ControllerConfig::new(ROOM),
            Arc::new(TypeChart::standard()),
            sink.clone(),
        );
        (controller, sink)
    }

    fn frame(body: &str) -> ServerFrame {
        parse_server_frame(&format!(">{}\n{}", ROOM, body)).unwrap()
    }

    fn move_html(name: &str, move_type: &str, category: &str, power: u32) -> String {
        format!(
            r#"|raw|<ul class="utilichart"><li class="result"><a data-entry="move|{name}"><span class="col movenamecol">{name}</span> <span class="col typecol"><img src="//play.pokemonshowdown.com/sprites/types/{move_type}.png" alt="{move_type}" height="14" width="32"><img src="//play.pokemonshowdown.com/sprites/categories/{category}.png" alt="{category}" height="14" width="32"></span> <span class="col labelcol"><em>Power</em><br>{power}</span> <span class="col widelabelcol"><em>Accuracy</em><br>100%</span> <span class="col movedesccol">No additional effect.</span> </a></li></ul>"#
        )
    }

    fn species_html(name: &str, types: &[&str], stats: [u32; 6]) -> String {
        let types: String = types
            .iter()
            .map(|t| format!(r#"<img src="//play.pokemonshowdown.com/sprites/types/{t}.png" alt="{t}" height="14" width="32">"#))
            .collect();
        let [hp, atk, def, spa, spd, spe] = stats;
        format!(
            r#"|raw|<ul class="utilichart"><li class="result"><a data-entry="pokemon|{name}"><span class="col pokemonnamecol">{name}</span> <span class="col typecol">{types}</span> <span style="float:left;min-height:26px"><span class="col abilitycol">Overgrow</span></span><span style="float:left;min-height:26px"><span class="col statcol"><em>HP</em><br>{hp}</span> <span class="col statcol"><em>Atk</em><br>{atk}</span> <span class="col statcol"><em>Def</em><br>{def}</span> <span class="col statcol"><em>SpA</em><br>{spa}</span> <span class="col statcol"><em>SpD</em><br>{spd}</span> <span class="col statcol"><em>Spe</em><br>{spe}</span> </span></a></li></ul>"#
        )
    }

    fn reference_data() -> Vec<RoomFragment> {
        [
            move_html("Flamethrower", "Fire", "Special", 90),
            move_html("Air Slash", "Flying", "Special", 75),
            move_html("Surf", "Water", "Special", 90),
            move_html("Ice Beam", "Ice", "Special", 90),
            species_html("Charizard", &["Fire", "Flying"], [78, 84, 78, 109, 85, 100]),
            species_html("Blastoise", &["Water"], [79, 83, 100, 85, 105, 78]),
            species_html("Venusaur", &["Grass", "Poison"], [80, 82, 83, 100, 100, 80]),
        ]
        .into_iter()
        .map(|html| RoomFragment::new(FragmentKind::ReferenceData, html))
        .collect()
    }

    fn inbound(fragments: Vec<RoomFragment>) -> (mpsc::Sender<RoomFragment>, mpsc::Receiver<RoomFragment>) {
        let (tx, rx) = mpsc::channel(16);
        for fragment in fragments {
            tx.try_send(fragment).unwrap();
        }
        (tx, rx)
    }

    #[tokio::test]
    async fn test_request_to_decision() {
        let (mut controller, sink) = controller();

        controller.on_frame(&frame(&format!("|request|{}", REQUEST))).unwrap();
        controller.on_frame(&frame(START)).unwrap();

        assert_eq!(controller.perspective(), Some(Player::P1));
        assert_eq!(controller.username(Player::P2), Some("Rival"));
        assert_eq!(controller.turn(), 1);
        assert_eq!(
            sink.sent(),
            [
                "battle-gen7randombattle-1|/data charizard",
                "battle-gen7randombattle-1|/data flamethrower",
                "battle-gen7randombattle-1|/data airslash",
                "battle-gen7randombattle-1|/data blastoise",
                "battle-gen7randombattle-1|/data surf",
                "battle-gen7randombattle-1|/data icebeam",
                "battle-gen7randombattle-1|/data venusaur",
            ]
        );
        assert!(!controller.is_synchronized());

        let (_tx, mut rx) = inbound(reference_data());
        let decision = controller.decide_and_act(&mut rx).await.unwrap();

        assert!(controller.is_synchronized());
        assert_eq!(
            decision.action,
            Action::UseMove {
                name: "Flamethrower".into(),
                slot: 1
            }
        );
        assert_eq!(decision.reason, DecisionReason::Commit);
        assert_eq!(sink.sent().last().unwrap(), "battle-gen7randombattle-1|/choose move 1|2");

        // Opponent stats are estimated from base stats, ours come from the request
        let venusaur = controller.opponent_team().find("Venusaur").unwrap();
        assert_eq!(venusaur.stats.hp, 187);
        assert_eq!(venusaur.stats.spe, 182);
        assert_eq!(controller.own_team().find("Charizard").unwrap().stats.spa, 228);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_timeout_falls_back() {
        let (mut controller, sink) = controller();
        controller.on_team_revealed(REQUEST).unwrap();
        assert_eq!(sink.lookups(), 6);

        // Nothing ever answers; the sender stays open
        let (_tx, mut rx) = inbound(Vec::new());
        let decision = controller.decide_and_act(&mut rx).await.unwrap();

        assert_eq!(decision.reason, DecisionReason::SyncTimeout);
        assert_eq!(
            decision.action,
            Action::UseMove {
                name: "Flamethrower".into(),
                slot: 1
            }
        );
        // Five resend rounds of all six missing names
        assert_eq!(sink.lookups(), 6 + 5 * 6);
        assert_eq!(sink.sent().last().unwrap(), "battle-gen7randombattle-1|/choose move 1|2");
    }

    #[tokio::test]
    async fn test_force_switch_uses_request_slot() {
        let (mut controller, sink) = controller();
        controller.on_team_revealed(FORCE_SWITCH).unwrap();

        let (_tx, mut rx) = inbound(reference_data());
        let decision = controller.decide_and_act(&mut rx).await.unwrap();

        assert_eq!(
            decision.action,
            Action::SwitchTo {
                name: "Blastoise".into()
            }
        );
        assert_eq!(sink.sent().last().unwrap(), "battle-gen7randombattle-1|/switch 2|5");
    }

    #[test]
    fn test_opponent_moves_are_looked_up() {
        let (mut controller, sink) = controller();
        controller.on_team_revealed(REQUEST).unwrap();
        controller.on_turn_update(START).unwrap();
        controller
            .on_turn_update("|move|p2a: Venusaur|Sludge Bomb|p1a: Charizard\n|move|p1a: Charizard|Flamethrower|p2a: Venusaur")
            .unwrap();

        let venusaur = controller.opponent_team().find("Venusaur").unwrap();
        assert_eq!(venusaur.moves.len(), 1);
        assert_eq!(venusaur.moves[0].id, "sludgebomb");
        assert_eq!(sink.sent().last().unwrap(), "battle-gen7randombattle-1|/data sludgebomb");
        assert_eq!(controller.own_team().find("Charizard").unwrap().moves.len(), 2);
    }

    #[test]
    fn test_buffs_reset_on_switch_and_faint() {
        let (mut controller, _sink) = controller();
        controller.on_team_revealed(REQUEST).unwrap();
        controller.on_turn_update(START).unwrap();

        controller
            .on_turn_update("|-boost|p2a: Venusaur|spa|1\n|-boost|p2a: Venusaur|spa|1\n|-unboost|p1a: Charizard|spe|1")
            .unwrap();
        assert_eq!(controller.opponent_team().buffs.spa, 2);
        assert_eq!(controller.own_team().buffs.spe, -1);

        controller
            .on_turn_update("|switch|p2a: Snorlax|Snorlax, L88, M|100/100")
            .unwrap();
        assert!(controller.opponent_team().buffs.is_neutral());
        assert_eq!(controller.opponent_team().active().unwrap().name, "Snorlax");

        controller.on_turn_update("|faint|p1a: Charizard").unwrap();
        assert!(controller.own_team().buffs.is_neutral());
        assert!(!controller.own_team().find("Charizard").unwrap().is_alive());
    }

    #[test]
    fn test_hp_updates_keep_their_scale() {
        let (mut controller, _sink) = controller();
        controller.on_team_revealed(REQUEST).unwrap();
        controller.on_turn_update(START).unwrap();

        controller
            .on_turn_update("|-damage|p2a: Venusaur|40/100\n|-damage|p1a: Charizard|125/250")
            .unwrap();
        assert_eq!(controller.opponent_team().find("Venusaur").unwrap().hp_percent(), 40.0);
        assert_eq!(controller.own_team().find("Charizard").unwrap().hp_percent(), 50.0);
    }

    #[test]
    fn test_unknown_entities_and_bad_fragments_are_dropped() {
        let (mut controller, sink) = controller();

        controller
            .on_turn_update("|-damage|p2a: Missingno|50/100\n|turn|4")
            .unwrap();
        assert_eq!(controller.turn(), 4);

        controller.on_team_revealed("{not json").unwrap();
        controller
            .on_fragment(&RoomFragment::new(FragmentKind::ReferenceData, "|raw|<b>hello</b>"))
            .unwrap();
        assert!(controller.latest_request().is_none());
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_reference_data_for_unseen_species() {
        let (mut controller, _sink) = controller();
        controller.on_team_revealed(REQUEST).unwrap();
        let before = controller.own_team().find("Charizard").unwrap().clone();

        controller.on_reference_data(&species_html("Dragonite", &["Dragon", "Flying"], [91, 134, 95, 100, 100, 80]));

        assert_eq!(controller.synchronizer().registry().species_count(), 1);
        let after = controller.own_team().find("Charizard").unwrap();
        assert_eq!(after.stats, before.stats);
        assert!(!after.is_species_resolved());
    }

    #[test]
    fn test_frames_for_other_rooms_are_ignored() {
        let (mut controller, _sink) = controller();
        let other = parse_server_frame(">battle-gen7randombattle-2\n|turn|9").unwrap();

        controller.on_frame(&other).unwrap();
        assert_eq!(controller.turn(), 0);
    }

    #[test]
    fn test_battle_end() {
        let (mut controller, sink) = controller();
        assert!(!controller.is_ended());

        controller
            .on_turn_update("|player|p1|Tactician|1|\n|player|p2|Rival|2|\n|win|Rival")
            .unwrap();
        let outcome = controller.outcome().unwrap();
        assert_eq!(
            outcome,
            &Outcome::Win {
                username: "Rival".into(),
                winner: Some(Player::P2)
            }
        );
        assert_eq!(outcome.loser(), Some(Player::P1));
        assert!(controller.is_ended());

        controller.save_replay().unwrap();
        controller.forfeit().unwrap();
        assert_eq!(
            sink.sent(),
            [
                "battle-gen7randombattle-1|/savereplay",
                "battle-gen7randombattle-1|/forfeit"
            ]
        );
    }

    #[test]
    fn test_unmatched_winner_and_tie() {
        let (mut unmatched, _sink) = controller();
        unmatched.on_turn_update("|win|Somebody Else").unwrap();
        let outcome = unmatched.outcome().unwrap();
        assert_eq!(outcome.winner(), None);
        assert_eq!(outcome.loser(), None);

        let (mut tied, _sink) = controller();
        tied.on_team_revealed(REQUEST).unwrap();
        assert_eq!(tied.player_named("tactician"), Some(Player::P1));
        tied.on_turn_update("|tie").unwrap();
        assert_eq!(tied.outcome(), Some(&Outcome::Tie));
    }

    #[tokio::test]
    async fn test_request_during_wait_sets_turn_context() {
        let (mut controller, sink) = controller();
        controller.on_team_revealed(REQUEST).unwrap();

        // A forced switch (e.g. after U-turn) with the active pokemon still healthy
        let forced = FORCE_SWITCH.replace("0 fnt", "250/250").replace("\"rqid\":5", "\"rqid\":6");
        let mut fragments = vec![RoomFragment::new(FragmentKind::TeamRequest, forced)];
        fragments.extend(reference_data());
        let (_tx, mut rx) = inbound(fragments);

        let decision = controller.decide_and_act(&mut rx).await.unwrap();

        assert_eq!(
            decision.action,
            Action::SwitchTo {
                name: "Blastoise".into()
            }
        );
        assert_eq!(sink.sent().last().unwrap(), "battle-gen7randombattle-1|/switch 2|6");
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();
        let controller = BattleController::on_room_init(
            ControllerConfig::new(ROOM),
            Arc::new(TypeChart::standard()),
            tx,
        );

        controller.set_timer(true).unwrap();
        assert_eq!(
            rx.recv().await.unwrap().to_wire_format(),
            "battle-gen7randombattle-1|/timer on"
        );

        drop(rx);
        assert!(matches!(controller.forfeit(), Err(BattleError::Send(_))));
    }

    #[test]
    fn test_config_from_json() {
        let config: ControllerConfig = serde_json::from_str(
            r#"{"room_id": "battle-gen7randombattle-9", "sync": {"timeout_ms": 1000}, "engine": {"ko_damage": 90}}"#,
        )
        .unwrap();

        assert_eq!(config.room_id, "battle-gen7randombattle-9");
        assert_eq!(config.sync.timeout, std::time::Duration::from_secs(1));
        assert_eq!(config.sync.stall_polls, 2);
        assert_eq!(config.engine.ko_damage, 90);
        assert_eq!(config.engine.chip_damage, 50);
    }
}
